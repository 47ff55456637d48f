//! Basic text normalization for BERT-family tokenizers.
//!
//! Turns raw text into an ordered list of word-like tokens:
//!
//! 1. Clean: drop NUL, U+FFFD and control characters; map whitespace to ASCII space.
//! 2. Optionally isolate CJK ideographs with surrounding spaces.
//! 3. Split on ASCII space.
//! 4. Per word: optionally lowercase, optionally strip accents (NFD, drop Mn, NFC).
//! 5. Split each word at punctuation; each punctuation char becomes its own token.

use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_normalization::UnicodeNormalization;

/// Pure text normalizer. Cheap to copy; holds only flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicNormalizer {
    lowercase: bool,
    isolate_cjk: bool,
    strip_accents: bool,
}

impl Default for BasicNormalizer {
    fn default() -> Self {
        Self::new(true, true, true)
    }
}

impl BasicNormalizer {
    pub fn new(lowercase: bool, isolate_cjk: bool, strip_accents: bool) -> Self {
        Self {
            lowercase,
            isolate_cjk,
            strip_accents,
        }
    }

    /// Normalize text into non-empty word tokens.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let cleaned = self.clean(text);

        let mut tokens = Vec::new();
        for segment in cleaned.split(' ').filter(|s| !s.is_empty()) {
            let mut word = if self.lowercase {
                segment.to_lowercase()
            } else {
                segment.to_string()
            };
            if self.strip_accents {
                word = strip_accents(&word);
            }
            split_on_punctuation(&word, &mut tokens);
        }
        tokens
    }

    /// Steps 1 and 2: character cleanup and CJK isolation in one pass.
    fn clean(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if ch == '\0' || ch == '\u{FFFD}' || is_control(ch) {
                continue;
            }
            if is_whitespace(ch) {
                out.push(' ');
            } else if self.isolate_cjk && is_cjk_ideograph(ch) {
                out.push(' ');
                out.push(ch);
                out.push(' ');
            } else {
                out.push(ch);
            }
        }
        out
    }
}

/// Canonical decomposition, drop non-spacing marks, recompose.
pub fn strip_accents(word: &str) -> String {
    word.nfd()
        .filter(|&c| !matches!(get_general_category(c), GeneralCategory::NonspacingMark))
        .nfc()
        .collect()
}

fn split_on_punctuation(word: &str, tokens: &mut Vec<String>) {
    let mut current = String::new();
    for ch in word.chars() {
        if is_punctuation(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(ch.to_string());
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
}

// ---------------------------------------------------------------------------
// Character classification helpers
// ---------------------------------------------------------------------------

/// Tab, newline and carriage return count as whitespace, never as control.
pub fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
        || matches!(get_general_category(ch), GeneralCategory::SpaceSeparator)
}

/// Any "other" (C*) category character except tab, newline and carriage return.
pub fn is_control(ch: char) -> bool {
    if matches!(ch, '\t' | '\n' | '\r') {
        return false;
    }
    matches!(
        get_general_category(ch),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
    )
}

/// ASCII symbol ranges plus every Unicode punctuation (P*) category.
///
/// The ASCII ranges include symbols such as `$`, `+` and `^` that
/// Unicode classifies as Sm/Sc/Sk.
pub fn is_punctuation(ch: char) -> bool {
    let cp = ch as u32;
    if (33..=47).contains(&cp)       // ! " # $ % & ' ( ) * + , - . /
        || (58..=64).contains(&cp)   // : ; < = > ? @
        || (91..=96).contains(&cp)   // [ \ ] ^ _ `
        || (123..=126).contains(&cp) // { | } ~
    {
        return true;
    }

    matches!(
        get_general_category(ch),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
    )
}

/// CJK Unified Ideographs, Extension A, Extensions B-F and Compatibility Ideographs.
///
/// Hangul, Hiragana and Katakana are not included; they are written with spaces.
pub fn is_cjk_ideograph(ch: char) -> bool {
    let cp = ch as u32;
    (0x4E00..=0x9FFF).contains(&cp)
        || (0x3400..=0x4DBF).contains(&cp)
        || (0x20000..=0x2A6DF).contains(&cp)
        || (0x2A700..=0x2B73F).contains(&cp)
        || (0x2B740..=0x2B81F).contains(&cp)
        || (0x2B820..=0x2CEAF).contains(&cp)
        || (0xF900..=0xFAFF).contains(&cp)
        || (0x2F800..=0x2FA1F).contains(&cp)
}
