//! Sequence encoder for SentencePiece/BPE models.
//!
//! Subword splitting is delegated to a [`SubwordSplitter`] (for example a
//! SentencePiece processor). [`BpeEncoder`] keeps control of the framing: it strips
//! any BOS/EOS/PAD pieces the splitter inserted, maps pieces through the vocabulary
//! (unknown pieces become UNK), truncates, and wraps the result as
//! `<bos> ... <eos>` padded to the fixed length. There is no pair mode.

use std::sync::Arc;

use tracing::debug;

use super::config::BpeConfig;
use super::{assemble, Encoding, SequenceEncoder};
use crate::error::EmbedError;
use crate::vocab::Vocabulary;

/// Text to subword token strings, with normalization and pre-tokenization applied.
///
/// Implementations must be thread-safe; one splitter is shared by every encode call.
pub trait SubwordSplitter: Send + Sync {
    fn split(&self, text: &str) -> Result<Vec<String>, EmbedError>;
}

/// Fixed-length encoder around an external BPE splitter.
pub struct BpeEncoder {
    splitter: Arc<dyn SubwordSplitter>,
    vocab: Arc<Vocabulary>,
    /// Marker strings removed from splitter output.
    framing_tokens: [String; 3],
    bos_id: u32,
    eos_id: u32,
    pad_id: u32,
    unk_id: u32,
    max_length: usize,
}

impl std::fmt::Debug for BpeEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeEncoder")
            .field("vocab_size", &self.vocab.len())
            .field("bos_id", &self.bos_id)
            .field("eos_id", &self.eos_id)
            .field("pad_id", &self.pad_id)
            .field("unk_id", &self.unk_id)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl BpeEncoder {
    /// Create an encoder. Fails if BOS/EOS/PAD/UNK are missing from the vocabulary
    /// or `max_length < 2`.
    pub fn new(
        splitter: Arc<dyn SubwordSplitter>,
        vocab: Arc<Vocabulary>,
        config: &BpeConfig,
    ) -> Result<Self, EmbedError> {
        let max_length = config.max_length();
        if max_length < 2 {
            return Err(EmbedError::MaxLengthTooSmall(max_length));
        }

        let bos_id = vocab.require("bos", &config.bos_token)?;
        let eos_id = vocab.require("eos", &config.eos_token)?;
        let pad_id = vocab.require("pad", &config.pad_token)?;
        let unk_id = vocab.require("unk", &config.unk_token)?;

        debug!(
            vocab_size = vocab.len(),
            bos_id,
            eos_id,
            pad_id,
            unk_id,
            max_length,
            "BPE encoder initialized"
        );

        Ok(Self {
            splitter,
            vocab,
            framing_tokens: [
                config.bos_token.clone(),
                config.eos_token.clone(),
                config.pad_token.clone(),
            ],
            bos_id,
            eos_id,
            pad_id,
            unk_id,
            max_length,
        })
    }

    /// Content IDs of `text`: framing pieces removed, unknown pieces mapped to UNK,
    /// no truncation.
    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>, EmbedError> {
        let pieces = self.splitter.split(text)?;
        Ok(pieces
            .iter()
            .filter(|piece| !self.framing_tokens.contains(piece))
            .map(|piece| self.vocab.token_to_id(piece).unwrap_or(self.unk_id))
            .collect())
    }

    pub fn bos_token_id(&self) -> u32 {
        self.bos_id
    }

    pub fn eos_token_id(&self) -> u32 {
        self.eos_id
    }

    pub fn unk_token_id(&self) -> u32 {
        self.unk_id
    }
}

impl SequenceEncoder for BpeEncoder {
    fn encode(&self, text: &str) -> Result<Encoding, EmbedError> {
        let mut ids = self.tokenize(text)?;
        // Reserve space for BOS and EOS.
        ids.truncate(self.max_length - 2);

        Ok(assemble(
            self.bos_id,
            &[(ids.as_slice(), 0)],
            self.eos_id,
            self.max_length,
            self.pad_id,
            0,
        ))
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_id
    }
}
