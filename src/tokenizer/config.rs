//! Tokenizer configuration for both sequence encoder variants.
//!
//! Both configs deserialize from a HuggingFace-style `tokenizer_config.json`; fields
//! that are absent fall back to BERT (WordPiece) or SentencePiece (BPE) defaults.
//! Special tokens may be written as plain strings or as added-token objects
//! (`{"content": "[UNK]", ...}`).
//!
//! The sequence length can come from two keys. An explicit `max_length` wins over
//! `model_max_length`; when neither holds a usable value the default of 512 applies.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::EmbedError;

/// Default fixed sequence length.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Default continuation prefix for WordPiece subwords.
pub const DEFAULT_CONTINUATION_PREFIX: &str = "##";

/// Words longer than this (in chars) become a single UNK.
pub const DEFAULT_MAX_INPUT_CHARS_PER_WORD: usize = 100;

/// Configuration for [`WordPieceEncoder`](super::WordPieceEncoder).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    #[serde(deserialize_with = "special_token")]
    pub unk_token: String,
    #[serde(deserialize_with = "special_token")]
    pub pad_token: String,
    #[serde(deserialize_with = "special_token")]
    pub cls_token: String,
    #[serde(deserialize_with = "special_token")]
    pub sep_token: String,
    /// Lowercase each word before segmentation.
    pub do_lower_case: bool,
    /// Surround CJK ideographs with spaces so each becomes its own word.
    pub tokenize_chinese_chars: bool,
    /// Strip combining accents. `None` follows `do_lower_case`.
    pub strip_accents: Option<bool>,
    pub continuing_subword_prefix: String,
    pub max_input_chars_per_word: usize,
    /// Fixed output length of every [`Encoding`](super::Encoding). Takes precedence
    /// over `model_max_length`.
    #[serde(deserialize_with = "sequence_length")]
    pub max_length: Option<usize>,
    /// The model's positional limit.
    #[serde(deserialize_with = "sequence_length")]
    pub model_max_length: Option<usize>,
    /// Token type written into padding positions.
    pub pad_token_type_id: i64,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            unk_token: "[UNK]".to_string(),
            pad_token: "[PAD]".to_string(),
            cls_token: "[CLS]".to_string(),
            sep_token: "[SEP]".to_string(),
            do_lower_case: true,
            tokenize_chinese_chars: true,
            strip_accents: None,
            continuing_subword_prefix: DEFAULT_CONTINUATION_PREFIX.to_string(),
            max_input_chars_per_word: DEFAULT_MAX_INPUT_CHARS_PER_WORD,
            max_length: None,
            model_max_length: None,
            pad_token_type_id: 0,
        }
    }
}

impl TokenizerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EmbedError> {
        let config: Self = serde_json::from_str(json)?;
        debug!(
            max_length = config.max_length(),
            do_lower_case = config.do_lower_case,
            "WordPiece tokenizer config parsed"
        );
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EmbedError> {
        Self::from_json_str(&read_config(path.as_ref())?)
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Effective sequence length: `max_length`, else `model_max_length`, else 512.
    pub fn max_length(&self) -> usize {
        resolve_length(self.max_length, self.model_max_length)
    }

    /// Effective accent-stripping flag.
    pub fn strip_accents(&self) -> bool {
        self.strip_accents.unwrap_or(self.do_lower_case)
    }

    /// Check the fields that do not depend on a vocabulary.
    pub fn validate(&self) -> Result<(), EmbedError> {
        let max_length = self.max_length();
        if max_length < 2 {
            return Err(EmbedError::MaxLengthTooSmall(max_length));
        }
        if self.continuing_subword_prefix.is_empty() {
            return Err(EmbedError::Config(
                "continuing_subword_prefix is blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for [`BpeEncoder`](super::BpeEncoder).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BpeConfig {
    #[serde(deserialize_with = "special_token")]
    pub bos_token: String,
    #[serde(deserialize_with = "special_token")]
    pub eos_token: String,
    #[serde(deserialize_with = "special_token")]
    pub pad_token: String,
    #[serde(deserialize_with = "special_token")]
    pub unk_token: String,
    #[serde(deserialize_with = "sequence_length")]
    pub max_length: Option<usize>,
    #[serde(deserialize_with = "sequence_length")]
    pub model_max_length: Option<usize>,
}

impl Default for BpeConfig {
    fn default() -> Self {
        Self {
            bos_token: "<s>".to_string(),
            eos_token: "</s>".to_string(),
            pad_token: "<pad>".to_string(),
            unk_token: "<unk>".to_string(),
            max_length: None,
            model_max_length: None,
        }
    }
}

impl BpeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EmbedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EmbedError> {
        Self::from_json_str(&read_config(path.as_ref())?)
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Effective sequence length: `max_length`, else `model_max_length`, else 512.
    pub fn max_length(&self) -> usize {
        resolve_length(self.max_length, self.model_max_length)
    }
}

fn resolve_length(max_length: Option<usize>, model_max_length: Option<usize>) -> usize {
    max_length.or(model_max_length).unwrap_or(DEFAULT_MAX_LENGTH)
}

fn read_config(path: &Path) -> Result<String, EmbedError> {
    if path.as_os_str().is_empty() {
        return Err(EmbedError::Config("tokenizer config path is blank".to_string()));
    }
    debug!(path = %path.display(), "Loading tokenizer config");
    Ok(std::fs::read_to_string(path)?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenSpec {
    Plain(String),
    Added { content: String },
}

fn special_token<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TokenSpec::deserialize(deserializer)? {
        TokenSpec::Plain(s) => s,
        TokenSpec::Added { content } => content,
    })
}

// `model_max_length` is often written as a huge float sentinel meaning "no limit";
// that, null, and any other non-integer read as unset.
fn sequence_length<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(n.and_then(|n| n.as_u64())
        .filter(|&v| v <= u32::MAX as u64)
        .map(|v| v as usize))
}
