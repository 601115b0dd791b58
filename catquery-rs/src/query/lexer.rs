//! Tokenizer for category query strings.
//!
//! Lexing never fails: unknown characters are absorbed into words and an
//! unterminated quote still yields a phrase token, so that every problem can
//! be reported by the validator with a position instead of a hard error.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// `NEAR/<n>` or `NEAR/<n>/ORDERED`, case-insensitive.
static NEAR_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^NEAR/(\d+)(/ORDERED)?$").unwrap());

// ============================================================================
// Tokens
// ============================================================================

/// What a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Word,
    /// A double-quoted phrase. `closed` is false when the input ended before
    /// the closing quote.
    Phrase { closed: bool },
    And,
    Or,
    Not,
    /// A proximity operator. A distance of 0 marks a malformed operator
    /// (`NEAR`, `NEAR/x`, `NEAR/0`), rejected by the parser.
    Near { distance: u32, ordered: bool },
    #[serde(rename = "LPAREN")]
    LParen,
    #[serde(rename = "RPAREN")]
    RParen,
    Eof,
}

/// A lexed token.
///
/// `position..end` is a character-offset range into the original query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    #[serde(flatten)]
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
    pub end: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, position: usize, end: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
            end,
        }
    }

    /// Whether this token is AND, OR or NEAR.
    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::And | TokenKind::Or | TokenKind::Near { .. }
        )
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

/// Collapse whitespace runs (tabs and newlines included) to single spaces and trim.
pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenize a query string. The result always ends with an EOF token.
///
/// Positions refer to the original (un-normalized) input, but the token
/// sequence is the same as for the whitespace-normalized input.
pub fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let ch = chars[i];

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch == '(' {
            tokens.push(Token::new(TokenKind::LParen, "(", i, i + 1));
            i += 1;
            continue;
        }
        if ch == ')' {
            tokens.push(Token::new(TokenKind::RParen, ")", i, i + 1));
            i += 1;
            continue;
        }

        // Phrase: verbatim until the next quote or end of input
        if ch == '"' {
            let start = i;
            i += 1;
            let mut text = String::new();
            while i < len && chars[i] != '"' {
                text.push(chars[i]);
                i += 1;
            }
            let closed = i < len;
            if closed {
                i += 1; // skip closing "
            }
            tokens.push(Token::new(TokenKind::Phrase { closed }, text, start, i));
            continue;
        }

        let start = i;
        while i < len && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        tokens.push(Token::new(classify_word(&word), word, start, i));
    }

    tokens.push(Token::new(TokenKind::Eof, "", len, len));
    tokens
}

fn classify_word(word: &str) -> TokenKind {
    let upper = word.to_uppercase();
    match upper.as_str() {
        "AND" => return TokenKind::And,
        "OR" => return TokenKind::Or,
        "NOT" => return TokenKind::Not,
        "NEAR" => {
            return TokenKind::Near {
                distance: 0,
                ordered: false,
            };
        }
        _ => {}
    }

    if let Some(caps) = NEAR_OPERATOR.captures(word) {
        // Overflowing distances fall through to the malformed marker.
        let distance = caps[1].parse::<u32>().unwrap_or(0);
        return TokenKind::Near {
            distance,
            ordered: caps.get(2).is_some(),
        };
    }

    if upper.starts_with("NEAR/") {
        return TokenKind::Near {
            distance: 0,
            ordered: false,
        };
    }

    TokenKind::Word
}

// ============================================================================
// Tests
// ============================================================================
