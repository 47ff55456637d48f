//! WordPiece sequence encoder for BERT-family models.
//!
//! The pipeline:
//!
//! 1. [`BasicNormalizer`] cleans the text and splits it into words and punctuation.
//! 2. [`WordPieceSegmenter`] greedily finds the longest vocabulary prefix of each word,
//!    continuing with the remainder under the `##` continuation prefix. A word that
//!    cannot be fully segmented, or that is too long, becomes a single UNK.
//! 3. The ID lists are truncated to fit, wrapped as `[CLS] A [SEP]` or
//!    `[CLS] A [SEP] B [SEP]`, and padded to the fixed `max_length`.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::config::TokenizerConfig;
use super::normalizer::BasicNormalizer;
use super::{assemble, Encoding, SequenceEncoder};
use crate::error::EmbedError;
use crate::vocab::Vocabulary;

/// Outcome of segmenting one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    /// The whole word was covered by vocabulary pieces.
    Matched(Vec<u32>),
    /// Some position had no matching piece, or the word was too long.
    Unmatched,
}

/// Greedy longest-match-first subword segmenter.
#[derive(Debug, Clone)]
pub struct WordPieceSegmenter {
    vocab: Arc<Vocabulary>,
    continuation_prefix: String,
    max_input_chars_per_word: usize,
    unk_id: u32,
}

impl WordPieceSegmenter {
    pub fn new(
        vocab: Arc<Vocabulary>,
        continuation_prefix: impl Into<String>,
        max_input_chars_per_word: usize,
        unk_id: u32,
    ) -> Self {
        Self {
            vocab,
            continuation_prefix: continuation_prefix.into(),
            max_input_chars_per_word,
            unk_id,
        }
    }

    /// Segment a single normalized word.
    ///
    /// Non-backtracking: the first position without any matching prefix fails the
    /// whole word, discarding pieces found so far.
    pub fn segment(&self, word: &str) -> Segmentation {
        // Char boundaries as byte offsets, including the end of the string.
        let bounds: Vec<usize> = word
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(word.len()))
            .collect();
        let n_chars = bounds.len() - 1;

        if n_chars > self.max_input_chars_per_word {
            return Segmentation::Unmatched;
        }

        let mut ids = Vec::new();
        let mut candidate = String::with_capacity(word.len() + self.continuation_prefix.len());
        let mut start = 0;

        while start < n_chars {
            let mut end = n_chars;
            let mut matched = None;

            while start < end {
                let piece = &word[bounds[start]..bounds[end]];
                let id = if start == 0 {
                    self.vocab.token_to_id(piece)
                } else {
                    candidate.clear();
                    candidate.push_str(&self.continuation_prefix);
                    candidate.push_str(piece);
                    self.vocab.token_to_id(&candidate)
                };

                if id.is_some() {
                    matched = id;
                    break;
                }
                end -= 1;
            }

            match matched {
                Some(id) => {
                    ids.push(id);
                    start = end;
                }
                None => return Segmentation::Unmatched,
            }
        }

        Segmentation::Matched(ids)
    }

    /// Segment a word and append its IDs, or a single UNK, to `output`.
    pub fn segment_into(&self, word: &str, output: &mut Vec<u32>) {
        match self.segment(word) {
            Segmentation::Matched(ids) => output.extend(ids),
            Segmentation::Unmatched => output.push(self.unk_id),
        }
    }

    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }
}

/// WordPiece encoder producing fixed-length single or paired encodings.
///
/// # Construction
///
/// Use [`WordPieceEncoder::new`] with a shared vocabulary and a [`TokenizerConfig`],
/// or [`WordPieceEncoder::from_files`] to load both from disk.
#[derive(Debug, Clone)]
pub struct WordPieceEncoder {
    vocab: Arc<Vocabulary>,
    normalizer: BasicNormalizer,
    segmenter: WordPieceSegmenter,
    /// [CLS] token ID (beginning of sequence).
    cls_id: u32,
    /// [SEP] token ID (separator / end of sequence).
    sep_id: u32,
    /// [PAD] token ID (padding).
    pad_id: u32,
    max_length: usize,
    pad_token_type_id: i64,
}

impl WordPieceEncoder {
    /// Create an encoder. Fails if any special token is missing from the vocabulary
    /// or `max_length < 2`.
    pub fn new(vocab: Arc<Vocabulary>, config: &TokenizerConfig) -> Result<Self, EmbedError> {
        config.validate()?;

        let unk_id = vocab.require("unk", &config.unk_token)?;
        let pad_id = vocab.require("pad", &config.pad_token)?;
        let cls_id = vocab.require("cls", &config.cls_token)?;
        let sep_id = vocab.require("sep", &config.sep_token)?;

        let normalizer = BasicNormalizer::new(
            config.do_lower_case,
            config.tokenize_chinese_chars,
            config.strip_accents(),
        );
        let segmenter = WordPieceSegmenter::new(
            Arc::clone(&vocab),
            config.continuing_subword_prefix.clone(),
            config.max_input_chars_per_word,
            unk_id,
        );

        debug!(
            vocab_size = vocab.len(),
            cls_id,
            sep_id,
            unk_id,
            pad_id,
            max_length = config.max_length(),
            "WordPiece encoder initialized"
        );

        Ok(Self {
            vocab,
            normalizer,
            segmenter,
            cls_id,
            sep_id,
            pad_id,
            max_length: config.max_length(),
            pad_token_type_id: config.pad_token_type_id,
        })
    }

    /// Load the vocabulary (`vocab.txt` or JSON) and an optional
    /// `tokenizer_config.json`; missing config means BERT defaults.
    /// `max_length` overrides the configured sequence length.
    pub fn from_files(
        vocab_path: impl AsRef<Path>,
        config_path: Option<&Path>,
        max_length: Option<usize>,
    ) -> Result<Self, EmbedError> {
        let vocab = Vocabulary::from_file(vocab_path)?;
        let mut config = match config_path {
            Some(path) => TokenizerConfig::from_file(path)?,
            None => TokenizerConfig::default(),
        };
        if let Some(max_length) = max_length {
            config = config.with_max_length(max_length);
        }
        Self::new(Arc::new(vocab), &config)
    }

    /// Normalized word tokens of `text`, before subword segmentation.
    pub fn words(&self, text: &str) -> Vec<String> {
        self.normalizer.normalize(text)
    }

    /// Content IDs of `text` without boundary tokens or truncation.
    pub fn tokenize(&self, text: &str) -> Vec<u32> {
        let mut ids = Vec::new();
        for word in self.normalizer.normalize(text) {
            self.segmenter.segment_into(&word, &mut ids);
        }
        ids
    }

    /// Turn IDs back into text, skipping [CLS]/[SEP]/[PAD] and joining
    /// continuation pieces onto the previous word.
    pub fn decode(&self, ids: &[i64]) -> String {
        let prefix = self.segmenter.continuation_prefix.as_str();
        let mut pieces: Vec<String> = Vec::new();
        for &id in ids {
            let Ok(id) = u32::try_from(id) else {
                continue;
            };
            if id == self.cls_id || id == self.sep_id || id == self.pad_id {
                continue;
            }
            let Some(token) = self.vocab.id_to_token(id) else {
                continue;
            };
            if let Some(suffix) = token.strip_prefix(prefix) {
                // Continuation piece: append to the previous word (no space).
                if let Some(last) = pieces.last_mut() {
                    last.push_str(suffix);
                } else {
                    pieces.push(suffix.to_string());
                }
            } else {
                pieces.push(token.to_string());
            }
        }
        pieces.join(" ")
    }

    pub fn cls_token_id(&self) -> u32 {
        self.cls_id
    }

    pub fn sep_token_id(&self) -> u32 {
        self.sep_id
    }

    pub fn unk_token_id(&self) -> u32 {
        self.segmenter.unk_id()
    }
}

impl SequenceEncoder for WordPieceEncoder {
    fn encode(&self, text: &str) -> Result<Encoding, EmbedError> {
        let mut ids = self.tokenize(text);
        // Reserve space for [CLS] and [SEP].
        ids.truncate(self.max_length - 2);

        Ok(assemble(
            self.cls_id,
            &[(ids.as_slice(), 0)],
            self.sep_id,
            self.max_length,
            self.pad_id,
            self.pad_token_type_id,
        ))
    }

    fn encode_pair(&self, text_a: &str, text_b: Option<&str>) -> Result<Encoding, EmbedError> {
        let text_b = text_b.ok_or(EmbedError::MissingInput("text_b"))?;
        // Pairs need room for three boundary tokens.
        if self.max_length < 3 {
            return Err(EmbedError::MaxLengthTooSmall(self.max_length));
        }

        let mut ids_a = self.tokenize(text_a);
        let mut ids_b = self.tokenize(text_b);
        // [CLS] A [SEP] B [SEP]
        truncate_pair(&mut ids_a, &mut ids_b, self.max_length.saturating_sub(3));

        Ok(assemble(
            self.cls_id,
            &[(ids_a.as_slice(), 0), (ids_b.as_slice(), 1)],
            self.sep_id,
            self.max_length,
            self.pad_id,
            self.pad_token_type_id,
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

/// Trim two ID lists until their combined length fits `budget`.
///
/// Each step drops the last ID of the longer list; on a tie the second list loses.
pub fn truncate_pair(a: &mut Vec<u32>, b: &mut Vec<u32>, budget: usize) {
    while a.len() + b.len() > budget {
        if a.len() > b.len() {
            a.pop();
        } else {
            b.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Helper: build a test vocabulary
    // -----------------------------------------------------------------------

    /// Token layout:
    ///   0: [PAD]  1: [UNK]  2: [CLS]  3: [SEP]
    ///   4: hello  5: world  6: ##ing  7: test  8: ,  9: ##s
    ///  10: run   11: ##ning 12: a    13: cafe 14: 我 15: un  16: ##aff 17: ##able
    fn make_vocab() -> Arc<Vocabulary> {
        let tokens = [
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "hello", "world", "##ing", "test", ",", "##s",
            "run", "##ning", "a", "cafe", "我", "un", "##aff", "##able",
        ];
        Arc::new(Vocabulary::from_tokens(
            tokens.iter().map(|s| s.to_string()).collect(),
        ))
    }

    fn make_encoder(max_length: usize) -> WordPieceEncoder {
        let config = TokenizerConfig::default().with_max_length(max_length);
        WordPieceEncoder::new(make_vocab(), &config).unwrap()
    }

    fn segmenter(max_chars: usize) -> WordPieceSegmenter {
        WordPieceSegmenter::new(make_vocab(), "##", max_chars, 1)
    }

    // -----------------------------------------------------------------------
    // Segmenter
    // -----------------------------------------------------------------------

    #[test]
    fn test_segment_whole_word() {
        assert_eq!(segmenter(100).segment("hello"), Segmentation::Matched(vec![4]));
    }

    #[test]
    fn test_segment_continuations() {
        assert_eq!(segmenter(100).segment("testing"), Segmentation::Matched(vec![7, 6]));
        assert_eq!(
            segmenter(100).segment("runnings"),
            Segmentation::Matched(vec![10, 11, 9])
        );
        assert_eq!(
            segmenter(100).segment("unaffable"),
            Segmentation::Matched(vec![15, 16, 17])
        );
    }

    #[test]
    fn test_segment_failure_discards_partial_pieces() {
        // "test" matches, "##x" does not: the whole word is unmatched.
        assert_eq!(segmenter(100).segment("testx"), Segmentation::Unmatched);
        let mut out = vec![4];
        segmenter(100).segment_into("testx", &mut out);
        assert_eq!(out, vec![4, 1]);
    }

    #[test]
    fn test_segment_unknown_chars() {
        assert_eq!(segmenter(100).segment("xyz"), Segmentation::Unmatched);
    }

    #[test]
    fn test_segment_overlength_word() {
        // Fully segmentable, but longer than the limit.
        assert_eq!(segmenter(6).segment("testing"), Segmentation::Unmatched);
        assert_eq!(segmenter(7).segment("testing"), Segmentation::Matched(vec![7, 6]));
    }

    #[test]
    fn test_segment_counts_chars_not_bytes() {
        // One char, three bytes.
        assert_eq!(segmenter(1).segment("我"), Segmentation::Matched(vec![14]));
    }

    #[test]
    fn test_segment_custom_prefix() {
        let tokens = ["[UNK]", "play", "@@er"];
        let vocab = Arc::new(Vocabulary::from_tokens(
            tokens.iter().map(|s| s.to_string()).collect(),
        ));
        let seg = WordPieceSegmenter::new(vocab, "@@", 100, 0);
        assert_eq!(seg.segment("player"), Segmentation::Matched(vec![1, 2]));
    }

    // -----------------------------------------------------------------------
    // Single-sequence encoding
    // -----------------------------------------------------------------------

    #[test]
    fn test_encode_hello_world() {
        let enc = make_encoder(8).encode("Hello, world!").unwrap();
        // "!" is not in the vocabulary.
        assert_eq!(enc.input_ids, vec![2, 4, 8, 5, 1, 3, 0, 0]);
        assert_eq!(enc.attention_mask, vec![1, 1, 1, 1, 1, 1, 0, 0]);
        assert_eq!(enc.token_type_ids, vec![0; 8]);
        assert_eq!(enc.sequence_length, 6);
    }

    #[test]
    fn test_encode_empty() {
        let enc = make_encoder(4).encode("").unwrap();
        assert_eq!(enc.input_ids, vec![2, 3, 0, 0]);
        assert_eq!(enc.sequence_length, 2);
    }

    #[test]
    fn test_encode_accent_and_cjk() {
        let enc = make_encoder(6).encode("Café我").unwrap();
        assert_eq!(enc.content_ids(), &[2, 13, 14, 3]);
    }

    #[test]
    fn test_encode_truncates_single() {
        let enc = make_encoder(4).encode("hello world run a").unwrap();
        assert_eq!(enc.input_ids, vec![2, 4, 5, 3]);
        assert_eq!(enc.sequence_length, 4);
    }

    #[test]
    fn test_encode_min_length_has_only_markers() {
        let enc = make_encoder(2).encode("hello world").unwrap();
        assert_eq!(enc.input_ids, vec![2, 3]);
    }

    #[test]
    fn test_encode_invariants() {
        let encoder = make_encoder(10);
        for text in ["", "hello", "hello world testing running", "xyz, a cafe 我 我 我 我 我"] {
            let enc = encoder.encode(text).unwrap();
            assert_eq!(enc.input_ids.len(), 10, "text: {:?}", text);
            assert_eq!(enc.attention_mask.len(), 10);
            assert_eq!(enc.token_type_ids.len(), 10);
            let mask_sum: i64 = enc.attention_mask.iter().sum();
            assert_eq!(mask_sum as usize, enc.sequence_length);
            assert_eq!(enc.input_ids[0], 2);
            assert_eq!(enc.input_ids[enc.sequence_length - 1], 3);
            for i in enc.sequence_length..10 {
                assert_eq!(enc.input_ids[i], 0);
                assert_eq!(enc.attention_mask[i], 0);
            }
            for &id in &enc.input_ids {
                assert!(encoder.vocabulary().id_to_token(id as u32).is_some());
            }
        }
    }

    #[test]
    fn test_encode_deterministic() {
        let encoder = make_encoder(16);
        let text = "Testing, running cafe";
        assert_eq!(encoder.encode(text).unwrap(), encoder.encode(text).unwrap());
    }

    #[test]
    fn test_unknown_word_is_single_unk() {
        let enc = make_encoder(8).encode("hello xyz world").unwrap();
        assert_eq!(enc.content_ids(), &[2, 4, 1, 5, 3]);
    }

    #[test]
    fn test_overlength_word_is_single_unk() {
        let config = TokenizerConfig {
            max_input_chars_per_word: 4,
            ..TokenizerConfig::default()
        }
        .with_max_length(8);
        let encoder = WordPieceEncoder::new(make_vocab(), &config).unwrap();
        let enc = encoder.encode("hello a").unwrap();
        assert_eq!(enc.content_ids(), &[2, 1, 12, 3]);
    }

    #[test]
    fn test_case_sensitive_config() {
        let config = TokenizerConfig {
            do_lower_case: false,
            ..TokenizerConfig::default()
        }
        .with_max_length(6);
        let encoder = WordPieceEncoder::new(make_vocab(), &config).unwrap();
        let enc = encoder.encode("Hello hello").unwrap();
        assert_eq!(enc.content_ids(), &[2, 1, 4, 3]);
    }

    // -----------------------------------------------------------------------
    // Pair encoding
    // -----------------------------------------------------------------------

    #[test]
    fn test_encode_pair_layout() {
        let enc = make_encoder(10).encode_pair("hello", Some("world test")).unwrap();
        assert_eq!(enc.input_ids, vec![2, 4, 3, 5, 7, 3, 0, 0, 0, 0]);
        assert_eq!(enc.token_type_ids, vec![0, 0, 0, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(enc.sequence_length, 6);
    }

    #[test]
    fn test_encode_pair_truncates_longer_first() {
        // Budget 3: A has 4 ids, B has 1 -> A keeps 2, B keeps 1.
        let enc = make_encoder(6)
            .encode_pair("hello world run a", Some("test"))
            .unwrap();
        assert_eq!(enc.input_ids, vec![2, 4, 5, 3, 7, 3]);
        assert_eq!(enc.token_type_ids, vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_encode_pair_missing_second_text() {
        let err = make_encoder(8).encode_pair("hello", None).unwrap_err();
        assert!(matches!(err, EmbedError::MissingInput("text_b")));
    }

    #[test]
    fn test_encode_pair_needs_three_positions() {
        let encoder = make_encoder(2);
        assert!(encoder.encode("hello").is_ok());
        assert!(matches!(
            encoder.encode_pair("hello", Some("world")),
            Err(EmbedError::MaxLengthTooSmall(2))
        ));

        let enc = make_encoder(3).encode_pair("hello", Some("world")).unwrap();
        assert_eq!(enc.input_ids, vec![2, 3, 3]);
        assert_eq!(enc.token_type_ids, vec![0, 0, 1]);
    }

    #[test]
    fn test_encode_pair_pad_type_id() {
        let config = TokenizerConfig {
            pad_token_type_id: 1,
            ..TokenizerConfig::default()
        }
        .with_max_length(7);
        let encoder = WordPieceEncoder::new(make_vocab(), &config).unwrap();
        let enc = encoder.encode_pair("a", Some("a")).unwrap();
        assert_eq!(enc.token_type_ids, vec![0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(enc.attention_mask, vec![1, 1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_truncate_pair_fairness() {
        let mut a = vec![1, 2, 3, 4];
        let mut b = vec![9];
        truncate_pair(&mut a, &mut b, 3);
        assert_eq!(a, vec![1, 2]);
        assert_eq!(b, vec![9]);
    }

    #[test]
    fn test_truncate_pair_tie_trims_second() {
        let mut a = vec![1, 2, 3];
        let mut b = vec![7, 8, 9];
        truncate_pair(&mut a, &mut b, 5);
        assert_eq!(a, vec![1, 2, 3]);
        assert_eq!(b, vec![7, 8]);
    }

    #[test]
    fn test_truncate_pair_noop_when_fits() {
        let mut a = vec![1];
        let mut b = vec![2];
        truncate_pair(&mut a, &mut b, 5);
        assert_eq!((a, b), (vec![1], vec![2]));
    }

    #[test]
    fn test_truncate_pair_zero_budget() {
        let mut a = vec![1, 2];
        let mut b = vec![3];
        truncate_pair(&mut a, &mut b, 0);
        assert!(a.is_empty() && b.is_empty());
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_missing_special_token_fails() {
        let vocab = Arc::new(Vocabulary::from_tokens(vec![
            "[PAD]".to_string(),
            "[UNK]".to_string(),
            "[CLS]".to_string(),
        ]));
        let err = WordPieceEncoder::new(vocab, &TokenizerConfig::default()).unwrap_err();
        assert!(matches!(err, EmbedError::MissingSpecialToken { role: "sep", .. }));
    }

    #[test]
    fn test_max_length_too_small_fails() {
        let config = TokenizerConfig::default().with_max_length(1);
        let err = WordPieceEncoder::new(make_vocab(), &config).unwrap_err();
        assert!(matches!(err, EmbedError::MaxLengthTooSmall(1)));
    }

    #[test]
    fn test_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let vocab_path = dir.path().join("vocab.txt");
        std::fs::write(&vocab_path, "[PAD]\n[UNK]\n[CLS]\n[SEP]\nhello\n").unwrap();
        let config_path = dir.path().join("tokenizer_config.json");
        std::fs::write(&config_path, r#"{"model_max_length": 5}"#).unwrap();

        let encoder =
            WordPieceEncoder::from_files(&vocab_path, Some(config_path.as_path()), None).unwrap();
        let enc = encoder.encode("HELLO").unwrap();
        assert_eq!(enc.input_ids, vec![2, 4, 3, 0, 0]);

        let encoder =
            WordPieceEncoder::from_files(&vocab_path, Some(config_path.as_path()), Some(3))
                .unwrap();
        assert_eq!(encoder.encode("HELLO").unwrap().input_ids, vec![2, 4, 3]);

        let defaults = WordPieceEncoder::from_files(&vocab_path, None, None).unwrap();
        assert_eq!(defaults.max_length(), 512);
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    #[test]
    fn test_decode_roundtrip_subwords() {
        let encoder = make_encoder(12);
        let enc = encoder.encode("testing, running").unwrap();
        assert_eq!(encoder.decode(&enc.input_ids), "testing , running");
    }

    #[test]
    fn test_decode_continuation_at_start() {
        let encoder = make_encoder(4);
        assert_eq!(encoder.decode(&[6]), "ing");
    }

    #[test]
    fn test_decode_skips_invalid_ids() {
        let encoder = make_encoder(4);
        assert_eq!(encoder.decode(&[-1, 4, 999, 1]), "hello [UNK]");
    }

    #[test]
    fn test_words() {
        assert_eq!(make_encoder(4).words("Hi, there"), vec!["hi", ",", "there"]);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WordPieceEncoder>();
        assert_send_sync::<WordPieceSegmenter>();
    }
}
