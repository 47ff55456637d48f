//! Sequence encoders: text to fixed-length model inputs.
//!
//! This module defines the [`SequenceEncoder`] trait implemented by both
//! [`WordPieceEncoder`] and [`BpeEncoder`], the [`Encoding`] they produce, and
//! the shared assembly/padding and batch helpers.

pub mod bpe;
pub mod config;
pub mod normalizer;
pub mod wordpiece;

pub use bpe::{BpeEncoder, SubwordSplitter};
pub use config::{BpeConfig, TokenizerConfig};
pub use normalizer::BasicNormalizer;
pub use wordpiece::{Segmentation, WordPieceEncoder, WordPieceSegmenter};

use crate::error::EmbedError;
use crate::vocab::Vocabulary;

/// Fixed-length model input produced by one encode call.
///
/// All three arrays have length exactly equal to the encoder's `max_length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    /// Token IDs, padded with the pad token ID.
    pub input_ids: Vec<i64>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<i64>,
    /// 0 for the first sequence, 1 for the second (pair mode only).
    pub token_type_ids: Vec<i64>,
    /// Number of non-pad positions.
    pub sequence_length: usize,
}

impl Encoding {
    /// Padded length (equals the encoder's `max_length`).
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Token IDs of the non-pad positions, boundary tokens included.
    pub fn content_ids(&self) -> &[i64] {
        &self.input_ids[..self.sequence_length]
    }
}

/// An encoder that turns text into an [`Encoding`].
///
/// Implementations hold only immutable state and are safe to share across threads.
pub trait SequenceEncoder: Send + Sync {
    /// Encode a single text.
    fn encode(&self, text: &str) -> Result<Encoding, EmbedError>;

    /// Encode a text pair. `text_b` is required; `None` is rejected before any work.
    fn encode_pair(&self, text_a: &str, text_b: Option<&str>) -> Result<Encoding, EmbedError> {
        let _ = (text_a, text_b);
        Err(EmbedError::Unsupported(
            "this encoder does not support sequence pairs".to_string(),
        ))
    }

    /// Fixed output length.
    fn max_length(&self) -> usize;

    /// The vocabulary every produced ID comes from.
    fn vocabulary(&self) -> &Vocabulary;

    /// Padding token ID.
    fn pad_token_id(&self) -> u32;
}

/// Encode a batch of texts. Each text is encoded independently; the first error
/// aborts the batch.
pub fn encode_batch(
    encoder: &dyn SequenceEncoder,
    texts: &[&str],
) -> Result<Vec<Encoding>, EmbedError> {
    texts.iter().map(|text| encoder.encode(text)).collect()
}

/// Lay out `open, seg0, close, seg1, close, ...` and pad to `max_length`.
///
/// The opening token takes type 0; each segment and its closing token take the
/// segment's type ID. Callers guarantee the content fits.
pub(crate) fn assemble(
    open_id: u32,
    segments: &[(&[u32], i64)],
    close_id: u32,
    max_length: usize,
    pad_id: u32,
    pad_type_id: i64,
) -> Encoding {
    let mut input_ids = Vec::with_capacity(max_length);
    let mut token_type_ids = Vec::with_capacity(max_length);

    input_ids.push(open_id as i64);
    token_type_ids.push(0);
    for &(ids, type_id) in segments {
        input_ids.extend(ids.iter().map(|&id| id as i64));
        token_type_ids.extend(std::iter::repeat(type_id).take(ids.len()));
        input_ids.push(close_id as i64);
        token_type_ids.push(type_id);
    }

    let sequence_length = input_ids.len();
    debug_assert!(sequence_length <= max_length);

    let mut attention_mask = Vec::with_capacity(max_length);
    attention_mask.resize(sequence_length, 1i64);
    attention_mask.resize(max_length, 0i64);
    input_ids.resize(max_length, pad_id as i64);
    token_type_ids.resize(max_length, pad_type_id);

    Encoding {
        input_ids,
        attention_mask,
        token_type_ids,
        sequence_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A minimal encoder: whitespace split, exact lookup, `<unk>` fallback.
    struct MockEncoder {
        vocab: Vocabulary,
        max_length: usize,
    }

    impl MockEncoder {
        fn new(max_length: usize) -> Self {
            let tokens = ["<pad>", "<bos>", "<eos>", "<unk>", "hello", "world", "foo"];
            Self {
                vocab: Vocabulary::from_tokens(tokens.iter().map(|s| s.to_string()).collect()),
                max_length,
            }
        }
    }

    impl SequenceEncoder for MockEncoder {
        fn encode(&self, text: &str) -> Result<Encoding, EmbedError> {
            let mut ids: Vec<u32> = text
                .split_whitespace()
                .map(|w| self.vocab.token_to_id(w).unwrap_or(3))
                .collect();
            ids.truncate(self.max_length - 2);
            Ok(assemble(1, &[(ids.as_slice(), 0)], 2, self.max_length, 0, 0))
        }

        fn max_length(&self) -> usize {
            self.max_length
        }

        fn vocabulary(&self) -> &Vocabulary {
            &self.vocab
        }

        fn pad_token_id(&self) -> u32 {
            0
        }
    }

    #[test]
    fn test_assemble_single() {
        let a: &[u32] = &[4, 5];
        let enc = assemble(1, &[(a, 0)], 2, 6, 0, 0);
        assert_eq!(enc.input_ids, vec![1, 4, 5, 2, 0, 0]);
        assert_eq!(enc.attention_mask, vec![1, 1, 1, 1, 0, 0]);
        assert_eq!(enc.token_type_ids, vec![0; 6]);
        assert_eq!(enc.sequence_length, 4);
        assert_eq!(enc.content_ids(), &[1, 4, 5, 2]);
    }

    #[test]
    fn test_assemble_pair_types() {
        let a: &[u32] = &[7];
        let b: &[u32] = &[8, 9];
        let enc = assemble(101, &[(a, 0), (b, 1)], 102, 8, 0, 0);
        assert_eq!(enc.input_ids, vec![101, 7, 102, 8, 9, 102, 0, 0]);
        assert_eq!(enc.token_type_ids, vec![0, 0, 0, 1, 1, 1, 0, 0]);
        assert_eq!(enc.sequence_length, 6);
    }

    #[test]
    fn test_assemble_custom_pad_type() {
        let empty: &[u32] = &[];
        let enc = assemble(1, &[(empty, 0)], 2, 4, 9, 1);
        assert_eq!(enc.input_ids, vec![1, 2, 9, 9]);
        assert_eq!(enc.token_type_ids, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_assemble_exact_fit() {
        let a: &[u32] = &[4, 5];
        let enc = assemble(1, &[(a, 0)], 2, 4, 0, 0);
        assert_eq!(enc.input_ids, vec![1, 4, 5, 2]);
        assert_eq!(enc.attention_mask, vec![1, 1, 1, 1]);
        assert_eq!(enc.len(), 4);
    }

    #[test]
    fn test_encode_batch_preserves_order() {
        let enc = MockEncoder::new(5);
        let results = encode_batch(&enc, &["hello world", "foo", ""]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].input_ids, vec![1, 4, 5, 2, 0]);
        assert_eq!(results[1].input_ids, vec![1, 6, 2, 0, 0]);
        assert_eq!(results[2].input_ids, vec![1, 2, 0, 0, 0]);
    }

    #[test]
    fn test_encode_batch_empty() {
        let enc = MockEncoder::new(4);
        assert!(encode_batch(&enc, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_default_pair_is_unsupported() {
        let enc = MockEncoder::new(4);
        assert!(matches!(
            enc.encode_pair("hello", Some("world")),
            Err(EmbedError::Unsupported(_))
        ));
    }

    #[test]
    fn test_trait_object_dispatch() {
        let enc: Box<dyn SequenceEncoder> = Box::new(MockEncoder::new(4));
        let encoding = enc.encode("hello").unwrap();
        assert_eq!(encoding.input_ids, vec![1, 4, 2, 0]);
        assert_eq!(enc.max_length(), 4);
        assert_eq!(enc.pad_token_id(), 0);
        assert_eq!(enc.vocabulary().token_to_id("foo"), Some(6));
    }
}
