//! Transcript tokenization and loading.
//!
//! The engine only ever sees an ordered list of [`TranscriptToken`]s.
//! Hosts with their own tokenizer can build tokens directly; for plain text
//! and common JSON shapes this module does the splitting.

use crate::error::{CatQueryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// One word of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptToken {
    pub text: String,
    /// Position in the token sequence.
    pub index: usize,
    /// Char offset of the word in the source text, when known.
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
}

/// Split text into transcript tokens.
///
/// Words are whitespace-separated; leading and trailing punctuation is
/// trimmed, inner apostrophes and hyphens are kept ("don't", "e-mail").
/// Words that are pure punctuation are dropped.
pub fn tokenize_transcript(text: &str) -> Vec<TranscriptToken> {
    let normalized: String = text.nfc().collect();
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;
    let chars: Vec<char> = normalized.chars().collect();

    for i in 0..=chars.len() {
        let boundary = i == chars.len() || chars[i].is_whitespace();
        match (boundary, word_start) {
            (true, Some(start)) => {
                push_word(&chars, start, i, &mut tokens);
                word_start = None;
            }
            (false, None) => word_start = Some(i),
            _ => {}
        }
    }

    tokens
}

fn push_word(chars: &[char], start: usize, end: usize, tokens: &mut Vec<TranscriptToken>) {
    let word = &chars[start..end];
    let Some(first) = word.iter().position(|c| c.is_alphanumeric()) else {
        return;
    };
    // `first` exists, so so does `last`
    let last = word.iter().rposition(|c| c.is_alphanumeric()).unwrap_or(first);

    tokens.push(TranscriptToken {
        text: word[first..=last].iter().collect(),
        index: tokens.len(),
        start: start + first,
        end: start + last + 1,
    });
}

/// JSON transcript shapes accepted by [`Transcript::load`].
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTranscript {
    Words(Vec<String>),
    Object {
        #[serde(default)]
        words: Option<Vec<String>>,
        #[serde(default)]
        text: Option<String>,
    },
}

/// A tokenized transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub tokens: Vec<TranscriptToken>,
}

impl Transcript {
    /// Tokenize free text.
    pub fn from_text(text: &str) -> Self {
        Self {
            tokens: tokenize_transcript(text),
        }
    }

    /// Use pre-split words as-is (NFC-normalized, no punctuation trimming).
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        let tokens = words
            .iter()
            .enumerate()
            .map(|(index, word)| TranscriptToken {
                text: word.as_ref().nfc().collect(),
                index,
                start: 0,
                end: 0,
            })
            .collect();
        Self { tokens }
    }

    /// Load a transcript from disk.
    ///
    /// `.json` files may hold an array of words, `{"words": [...]}` or
    /// `{"text": "..."}`. Anything else is read as plain text.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CatQueryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if !is_json {
            return Ok(Self::from_text(&content));
        }

        let parsed: JsonTranscript =
            serde_json::from_str(&content).map_err(|e| CatQueryError::InvalidTranscript {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        match parsed {
            JsonTranscript::Words(words)
            | JsonTranscript::Object {
                words: Some(words), ..
            } => Ok(Self::from_words(&words)),
            JsonTranscript::Object {
                text: Some(text), ..
            } => Ok(Self::from_text(&text)),
            JsonTranscript::Object { .. } => Err(CatQueryError::InvalidTranscript {
                path: path.to_path_buf(),
                message: "expected a word array, \"words\" or \"text\"".to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.text.as_str())
    }
}
