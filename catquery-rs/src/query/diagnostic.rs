//! Error codes, positions and validation results.

use crate::query::types::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Syntax
    SyntaxError,
    UnbalancedParentheses,
    UnbalancedQuotes,
    InvalidOperator,
    UnexpectedToken,
    // Semantic
    EmptyQuery,
    EmptyGroup,
    DanglingOperator,
    EmptyTerm,
    // Limits
    QueryTooLong,
    TooManyTerms,
    NestingTooDeep,
    PhraseTooLong,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SyntaxError => "SYNTAX_ERROR",
            ErrorCode::UnbalancedParentheses => "UNBALANCED_PARENTHESES",
            ErrorCode::UnbalancedQuotes => "UNBALANCED_QUOTES",
            ErrorCode::InvalidOperator => "INVALID_OPERATOR",
            ErrorCode::UnexpectedToken => "UNEXPECTED_TOKEN",
            ErrorCode::EmptyQuery => "EMPTY_QUERY",
            ErrorCode::EmptyGroup => "EMPTY_GROUP",
            ErrorCode::DanglingOperator => "DANGLING_OPERATOR",
            ErrorCode::EmptyTerm => "EMPTY_TERM",
            ErrorCode::QueryTooLong => "QUERY_TOO_LONG",
            ErrorCode::TooManyTerms => "TOO_MANY_TERMS",
            ErrorCode::NestingTooDeep => "NESTING_TOO_DEEP",
            ErrorCode::PhraseTooLong => "PHRASE_TOO_LONG",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-blocking diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// The whole query is a negation and matches any transcript lacking the term.
    NegationOnly,
    DoubleNegation,
    /// A wildcard with fewer than two literal characters before it.
    ShortWildcardPrefix,
    /// A `*` that is not at the end of a word, matched literally.
    EmbeddedWildcard,
}

/// A location in the query text, for highlighting in an editor.
///
/// `start..end` are character offsets; `line` and `column` are 1-based and
/// refer to `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Resolve a span against the query text, clamping it into range.
    pub fn from_span(raw_text: &str, span: Span) -> Self {
        let len = raw_text.chars().count();
        let end = span.end.min(len);
        let start = span.start.min(end);

        let mut line = 1;
        let mut column = 1;
        for ch in raw_text.chars().take(start) {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A position covering the whole query.
    pub fn whole(raw_text: &str) -> Self {
        Self::from_span(raw_text, Span::new(0, raw_text.chars().count()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub message: String,
    pub position: Position,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}: {}",
            self.code, self.position.line, self.position.column, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub code: WarningCode,
    pub message: String,
    pub position: Position,
}

/// Every problem found in a query, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error(&mut self, code: ErrorCode, message: impl Into<String>, position: Position) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            code,
            message: message.into(),
            position,
        });
    }

    pub fn warning(&mut self, code: WarningCode, message: impl Into<String>, position: Position) {
        self.warnings.push(ValidationWarning {
            code,
            message: message.into(),
            position,
        });
    }

    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Error codes in order, mostly for assertions and logging.
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "valid");
        }
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_line_and_column() {
        let raw = "a AND\n  (b OR";
        let pos = Position::from_span(raw, Span::new(8, 9));
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 3);
        assert_eq!((pos.start, pos.end), (8, 9));
    }

    #[test]
    fn test_position_clamps_out_of_range() {
        let pos = Position::from_span("abc", Span::new(7, 12));
        assert_eq!((pos.start, pos.end), (3, 3));
        assert_eq!(pos.column, 4);
    }

    #[test]
    fn test_whole_position() {
        let pos = Position::whole("héllo");
        assert_eq!((pos.start, pos.end), (0, 5));
        assert_eq!((pos.line, pos.column), (1, 1));
    }

    #[test]
    fn test_result_error_marks_invalid() {
        let mut result = ValidationResult::new();
        assert!(result.is_valid);
        result.warning(WarningCode::DoubleNegation, "x", Position::whole("x"));
        assert!(result.is_valid);
        result.error(ErrorCode::EmptyGroup, "empty", Position::whole("()"));
        assert!(!result.is_valid);
        assert!(result.has_error(ErrorCode::EmptyGroup));
        assert_eq!(result.codes(), vec![ErrorCode::EmptyGroup]);
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::UnbalancedParentheses).unwrap();
        assert_eq!(json, "\"UNBALANCED_PARENTHESES\"");
        assert_eq!(ErrorCode::TooManyTerms.to_string(), "TOO_MANY_TERMS");
    }
}
