//! strata-tokenize: Encode text into fixed-length WordPiece model inputs.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde::Serialize;

use strata_encoder::cli;
use strata_encoder::tokenizer::{Encoding, SequenceEncoder, WordPieceEncoder};

#[derive(Parser)]
#[command(
    name = "strata-tokenize",
    about = "Encode text into input_ids / attention_mask / token_type_ids"
)]
struct Args {
    /// Vocabulary file: vocab.txt (one token per line) or JSON
    #[arg(long)]
    vocab: PathBuf,

    /// tokenizer_config.json; BERT defaults when omitted
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Text to encode
    #[arg(short = 'p', long, conflicts_with_all = ["file", "stdin"])]
    prompt: Option<String>,

    /// Read text from file
    #[arg(short = 'f', long, conflicts_with = "stdin")]
    file: Option<PathBuf>,

    /// Read text from stdin
    #[arg(long)]
    stdin: bool,

    /// Second text; encodes a sequence pair
    #[arg(long)]
    pair: Option<String>,

    /// Override the configured fixed sequence length
    #[arg(long)]
    max_length: Option<usize>,

    /// Print padding positions as well
    #[arg(long)]
    show_padding: bool,

    /// Output format: text or json
    #[arg(long, default_value = "text", value_parser = validate_output_format)]
    output_format: String,

    /// Suppress all logging
    #[arg(long)]
    log_disable: bool,
}

fn validate_output_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("Unknown output format '{}'. Options: text, json", s)),
    }
}

#[derive(Serialize)]
struct TokenEntry {
    id: i64,
    text: String,
    type_id: i64,
}

#[derive(Serialize)]
struct JsonOutput {
    tokens: Vec<TokenEntry>,
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
    sequence_length: usize,
    max_length: usize,
    decoded: String,
}

fn main() {
    let args = Args::parse();
    cli::init_logging(args.log_disable);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let encoder = cli::load_wordpiece(&args.vocab, args.config.as_deref(), args.max_length)?;
    let input = cli::read_input(args.prompt.as_deref(), args.file.as_deref(), args.stdin)?;

    let encoding = match args.pair.as_deref() {
        Some(second) => encoder.encode_pair(&input, Some(second))?,
        None => encoder.encode(&input)?,
    };

    let shown = if args.show_padding {
        encoding.len()
    } else {
        encoding.sequence_length
    };
    let tokens = token_entries(&encoder, &encoding, shown);

    match args.output_format.as_str() {
        "json" => {
            let output = JsonOutput {
                tokens,
                decoded: encoder.decode(&encoding.input_ids),
                max_length: encoding.len(),
                sequence_length: encoding.sequence_length,
                input_ids: encoding.input_ids,
                attention_mask: encoding.attention_mask,
                token_type_ids: encoding.token_type_ids,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            for entry in &tokens {
                println!("{:>6} -> '{}' (type {})", entry.id, entry.text, entry.type_id);
            }
            println!(
                "Sequence length: {} / {}",
                encoding.sequence_length,
                encoding.len()
            );
        }
    }

    Ok(())
}

fn token_entries(encoder: &WordPieceEncoder, encoding: &Encoding, count: usize) -> Vec<TokenEntry> {
    let vocab = encoder.vocabulary();
    encoding
        .input_ids
        .iter()
        .zip(&encoding.token_type_ids)
        .take(count)
        .map(|(&id, &type_id)| TokenEntry {
            id,
            text: u32::try_from(id)
                .ok()
                .and_then(|id| vocab.id_to_token(id))
                .unwrap_or("<invalid>")
                .to_string(),
            type_id,
        })
        .collect()
}
