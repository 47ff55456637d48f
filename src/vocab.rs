//! Vocabulary table: exact token string to token ID mapping.
//!
//! A [`Vocabulary`] is built once from a token list, an explicit token -> ID map,
//! a `vocab.txt` file (one token per line), or a JSON vocabulary, and is then shared
//! read-only (usually behind an `Arc`) by every encoder. Lookups are exact and
//! byte-sensitive; there is no case folding or fallback merging.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::EmbedError;

/// Immutable token <-> ID table.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Token string -> token ID lookup.
    token_to_id: HashMap<String, u32>,
    /// Token ID -> token string (for decoding). IDs may be sparse.
    id_to_token: HashMap<u32, String>,
}

impl Vocabulary {
    /// Build a vocabulary from tokens indexed by ID.
    ///
    /// The position of each token is its ID. If a token appears twice the later
    /// position wins for string lookups.
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        let mut token_to_id = HashMap::with_capacity(tokens.len());
        let mut id_to_token = HashMap::with_capacity(tokens.len());
        for (i, tok) in tokens.into_iter().enumerate() {
            token_to_id.insert(tok.clone(), i as u32);
            id_to_token.insert(i as u32, tok);
        }

        let vocab = Self {
            token_to_id,
            id_to_token,
        };
        debug!(vocab_size = vocab.len(), "Vocabulary built from token list");
        vocab
    }

    /// Build a vocabulary from an explicit token -> ID map.
    pub fn from_map(map: HashMap<String, u32>) -> Self {
        let id_to_token = map.iter().map(|(tok, &id)| (id, tok.clone())).collect();
        let vocab = Self {
            token_to_id: map,
            id_to_token,
        };
        debug!(vocab_size = vocab.len(), "Vocabulary built from token map");
        vocab
    }

    /// Build a vocabulary from `vocab.txt` content (one token per line).
    pub fn from_vocab_text(vocab_text: &str) -> Self {
        let tokens = vocab_text
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        Self::from_tokens(tokens)
    }

    /// Parse a JSON vocabulary.
    ///
    /// Accepted layouts:
    /// - an array whose elements are `[token, score]` pairs or bare token strings
    ///   (the ID is the array index),
    /// - an object mapping token -> non-negative integer ID.
    pub fn from_json_str(json: &str) -> Result<Self, EmbedError> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Array(entries) => {
                let mut tokens = Vec::with_capacity(entries.len());
                for (i, entry) in entries.into_iter().enumerate() {
                    let token = match entry {
                        Value::String(s) => s,
                        Value::Array(mut pair) if !pair.is_empty() => match pair.swap_remove(0) {
                            Value::String(s) => s,
                            other => {
                                return Err(EmbedError::Config(format!(
                                    "vocabulary entry {} has a non-string token: {}",
                                    i, other
                                )))
                            }
                        },
                        other => {
                            return Err(EmbedError::Config(format!(
                                "vocabulary entry {} is neither a token nor a [token, score] pair: {}",
                                i, other
                            )))
                        }
                    };
                    tokens.push(token);
                }
                Ok(Self::from_tokens(tokens))
            }
            Value::Object(entries) => {
                let mut map = HashMap::with_capacity(entries.len());
                for (token, id) in entries {
                    let id = id
                        .as_u64()
                        .and_then(|id| u32::try_from(id).ok())
                        .ok_or_else(|| {
                            EmbedError::Config(format!(
                                "vocabulary id for '{}' is not a valid token id: {}",
                                token, id
                            ))
                        })?;
                    map.insert(token, id);
                }
                Ok(Self::from_map(map))
            }
            other => Err(EmbedError::Config(format!(
                "vocabulary JSON must be an array or an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Load a vocabulary file. `.json` files go through [`Vocabulary::from_json_str`],
    /// anything else is read as `vocab.txt`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EmbedError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(EmbedError::Config("vocabulary path is blank".to_string()));
        }
        debug!(path = %path.display(), "Loading vocabulary");
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&content)
        } else {
            Ok(Self::from_vocab_text(&content))
        }
    }

    /// Exact lookup of a token string.
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Reverse lookup of a token ID.
    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(&id).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Resolve a required special token, failing with a configuration error.
    pub fn require(&self, role: &'static str, token: &str) -> Result<u32, EmbedError> {
        if token.trim().is_empty() {
            return Err(EmbedError::Config(format!("{} token is blank", role)));
        }
        self.token_to_id(token)
            .ok_or_else(|| EmbedError::MissingSpecialToken {
                role,
                token: token.to_string(),
            })
    }

    /// Number of distinct token strings.
    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
