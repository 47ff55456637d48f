//! Shared CLI utilities for strata-encoder binary tools.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::EmbedError;
use crate::tokenizer::WordPieceEncoder;

/// Initialize tracing/logging to stderr.
///
/// If `disable` is true, no output is produced.
/// Otherwise respects `RUST_LOG` env var, defaulting to WARN.
pub fn init_logging(disable: bool) {
    use tracing_subscriber::EnvFilter;

    if disable {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber may already be installed (tests, embedding hosts).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Read input text from one of: literal text, file path, or stdin.
pub fn read_input(
    text: Option<&str>,
    file: Option<&Path>,
    use_stdin: bool,
) -> Result<String, EmbedError> {
    if let Some(text) = text {
        return Ok(text.to_string());
    }

    if let Some(path) = file {
        debug!(path = %path.display(), "Reading input file");
        return Ok(std::fs::read_to_string(path)?);
    }

    if use_stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    Err(EmbedError::MissingInput("text (use --prompt, --file, or --stdin)"))
}

/// Build a WordPiece encoder from a vocabulary file and an optional
/// `tokenizer_config.json`, with an optional sequence length override.
pub fn load_wordpiece(
    vocab_path: &Path,
    config_path: Option<&Path>,
    max_length: Option<usize>,
) -> Result<WordPieceEncoder, EmbedError> {
    debug!(vocab = %vocab_path.display(), ?max_length, "Loading WordPiece encoder");
    WordPieceEncoder::from_files(vocab_path, config_path, max_length)
}
