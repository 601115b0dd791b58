//! Recursive descent parser for category query strings.
//!
//! Grammar (highest precedence last):
//! ```text
//! query     = or_expr
//! or_expr   = and_expr ("OR" and_expr)*
//! and_expr  = near_expr ("AND" near_expr)*
//! near_expr = not_expr ("NEAR/n" not_expr)?
//! not_expr  = "NOT" not_expr | primary
//! primary   = WORD | PHRASE | "(" query ")"
//! ```
//!
//! Operators are required between terms: `refund return` is an error, not
//! an implicit AND. AND/OR chains fold left-associatively.

use crate::query::diagnostic::{ErrorCode, Position, ValidationError};
use crate::query::lexer::{Token, TokenKind, tokenize};
use crate::query::types::{Node, Span};
use thiserror::Error;

/// Recursion guard for groups and negations, independent of configured limits.
const MAX_NESTING: usize = 256;

/// A structurally fatal problem that prevents building a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    /// Convert into a validation error positioned against `raw_text`.
    pub fn to_validation_error(&self, raw_text: &str) -> ValidationError {
        ValidationError {
            code: self.code,
            message: self.message.clone(),
            position: Position::from_span(raw_text, self.span),
        }
    }
}

fn token_span(token: &Token) -> Span {
    Span::new(token.position, token.end)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    /// Current token. The token stream always ends in EOF, which is sticky.
    fn peek(&self) -> &'a Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn enter(&mut self, token: &Token) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(ParseError::new(
                ErrorCode::NestingTooDeep,
                format!("Query nesting exceeds {} levels", MAX_NESTING),
                token_span(token),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    /// or_expr = and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_and_expr()?;

        while self.peek().kind == TokenKind::Or {
            let op = self.advance();
            self.expect_operand(op)?;
            let right = self.parse_and_expr()?;
            left = Node::or(left, right);
        }

        Ok(left)
    }

    /// and_expr = near_expr ("AND" near_expr)*
    fn parse_and_expr(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_near_expr()?;

        while self.peek().kind == TokenKind::And {
            let op = self.advance();
            self.expect_operand(op)?;
            let right = self.parse_near_expr()?;
            left = Node::and(left, right);
        }

        Ok(left)
    }

    /// near_expr = not_expr ("NEAR/n" not_expr)?
    fn parse_near_expr(&mut self) -> Result<Node, ParseError> {
        let left = self.parse_not_expr()?;

        if let TokenKind::Near { distance, ordered } = self.peek().kind {
            let op = self.advance();
            if distance == 0 {
                return Err(ParseError::new(
                    ErrorCode::InvalidOperator,
                    format!(
                        "Invalid proximity operator '{}': expected NEAR/<n> with n >= 1",
                        op.text
                    ),
                    token_span(op),
                ));
            }
            self.expect_operand(op)?;
            let right = self.parse_not_expr()?;

            if let TokenKind::Near { .. } = self.peek().kind {
                let next = self.peek();
                return Err(ParseError::new(
                    ErrorCode::UnexpectedToken,
                    format!(
                        "Chained proximity operator '{}' needs parentheses",
                        next.text
                    ),
                    token_span(next),
                ));
            }

            return Ok(Node::near(left, right, distance, ordered));
        }

        Ok(left)
    }

    /// not_expr = "NOT" not_expr | primary
    fn parse_not_expr(&mut self) -> Result<Node, ParseError> {
        if self.peek().kind != TokenKind::Not {
            return self.parse_primary();
        }

        let op = self.advance();
        self.expect_operand(op)?;
        self.enter(op)?;
        let operand = self.parse_not_expr()?;
        self.leave();
        Ok(Node::not(operand))
    }

    /// primary = WORD | PHRASE | "(" query ")"
    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Word => {
                self.advance();
                Ok(Node::word_at(&tok.text, token_span(tok)))
            }
            TokenKind::Phrase { .. } => {
                self.advance();
                Ok(Node::phrase_at(&tok.text, token_span(tok)))
            }
            TokenKind::LParen => self.parse_group(),
            TokenKind::RParen => Err(ParseError::new(
                ErrorCode::UnbalancedParentheses,
                "Unmatched closing parenthesis",
                token_span(tok),
            )),
            TokenKind::And | TokenKind::Or | TokenKind::Near { .. } => Err(ParseError::new(
                ErrorCode::DanglingOperator,
                format!("Operator '{}' is missing its left operand", tok.text),
                token_span(tok),
            )),
            TokenKind::Not => Err(ParseError::new(
                ErrorCode::UnexpectedToken,
                format!("Unexpected '{}'", tok.text),
                token_span(tok),
            )),
            TokenKind::Eof => Err(ParseError::new(
                ErrorCode::SyntaxError,
                "Unexpected end of query",
                token_span(tok),
            )),
        }
    }

    fn parse_group(&mut self) -> Result<Node, ParseError> {
        let open = self.advance(); // consume (
        match self.peek().kind {
            TokenKind::RParen => {
                let close = self.peek();
                return Err(ParseError::new(
                    ErrorCode::EmptyGroup,
                    "Empty parentheses",
                    Span::new(open.position, close.end),
                ));
            }
            TokenKind::Eof => return Err(unclosed(open)),
            _ => {}
        }

        self.enter(open)?;
        let inner = self.parse_or_expr()?;
        self.leave();

        match self.peek().kind {
            TokenKind::RParen => {
                self.advance();
                Ok(inner)
            }
            TokenKind::Eof => Err(unclosed(open)),
            _ => Err(self.unexpected_after_operand()),
        }
    }

    /// Check that an operator has something to its right.
    fn expect_operand(&self, op: &Token) -> Result<(), ParseError> {
        let next = self.peek();
        match next.kind {
            TokenKind::Eof | TokenKind::RParen => Err(ParseError::new(
                ErrorCode::DanglingOperator,
                format!("Operator '{}' is missing its right operand", op.text),
                token_span(op),
            )),
            TokenKind::And | TokenKind::Or | TokenKind::Near { .. } => Err(ParseError::new(
                ErrorCode::UnexpectedToken,
                format!(
                    "Unexpected operator '{}' after '{}'",
                    next.text, op.text
                ),
                token_span(next),
            )),
            _ => Ok(()),
        }
    }

    /// Error for a token that follows a complete operand but cannot continue it.
    fn unexpected_after_operand(&self) -> ParseError {
        let tok = self.peek();
        match tok.kind {
            TokenKind::RParen => ParseError::new(
                ErrorCode::UnbalancedParentheses,
                "Unmatched closing parenthesis",
                token_span(tok),
            ),
            TokenKind::Word | TokenKind::Phrase { .. } | TokenKind::LParen | TokenKind::Not => {
                ParseError::new(
                    ErrorCode::UnexpectedToken,
                    format!(
                        "Expected an operator (AND, OR, NEAR/n) before '{}'",
                        tok.text
                    ),
                    token_span(tok),
                )
            }
            _ => ParseError::new(
                ErrorCode::UnexpectedToken,
                format!("Unexpected token '{}'", tok.text),
                token_span(tok),
            ),
        }
    }
}

fn unclosed(open: &Token) -> ParseError {
    ParseError::new(
        ErrorCode::UnbalancedParentheses,
        "Missing closing parenthesis",
        token_span(open),
    )
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a token stream (as produced by [`tokenize`]) into an AST.
///
/// An empty stream, or one holding only EOF, fails with `EMPTY_QUERY`.
pub fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
    match tokens.first() {
        None => {
            return Err(ParseError::new(
                ErrorCode::EmptyQuery,
                "Query is empty",
                Span::default(),
            ));
        }
        Some(first) if first.kind == TokenKind::Eof => {
            return Err(ParseError::new(
                ErrorCode::EmptyQuery,
                "Query is empty",
                Span::new(0, first.position),
            ));
        }
        Some(_) => {}
    }

    let mut parser = Parser::new(tokens);
    let node = parser.parse_or_expr()?;

    // Check for unconsumed tokens
    if parser.peek().kind != TokenKind::Eof {
        return Err(parser.unexpected_after_operand());
    }

    Ok(node)
}

/// Tokenize and parse a query string.
pub fn parse_query(input: &str) -> Result<Node, ParseError> {
    parse(&tokenize(input))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(input: &str) -> ParseError {
        match parse_query(input) {
            Ok(node) => panic!("Expected error for {:?}, got {}", input, node),
            Err(e) => e,
        }
    }

    #[test]
    fn test_parse_single_word() {
        let node = parse_query("refund").unwrap();
        assert_eq!(
            node,
            Node::Word {
                text: "refund".to_string(),
                has_wildcard: false,
                span: Span::new(0, 6),
            }
        );
    }

    #[test]
    fn test_parse_wildcard_word() {
        match parse_query("refund*").unwrap() {
            Node::Word {
                text,
                has_wildcard,
                span,
            } => {
                assert_eq!(text, "refund");
                assert!(has_wildcard);
                assert_eq!(span, Span::new(0, 7));
            }
            other => panic!("Expected Word, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_phrase() {
        match parse_query("\"request  a refund\"").unwrap() {
            Node::Phrase { words, .. } => assert_eq!(words, vec!["request", "a", "refund"]),
            other => panic!("Expected Phrase, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_precedence_and_over_or() {
        let node = parse_query("a AND b OR c").unwrap();
        assert_eq!(node.to_string(), "((a AND b) OR c)");

        let node = parse_query("a OR b AND c").unwrap();
        assert_eq!(node.to_string(), "(a OR (b AND c))");
    }

    #[test]
    fn test_parse_precedence_near_over_and() {
        let node = parse_query("a AND b NEAR/3 c").unwrap();
        assert_eq!(node.to_string(), "(a AND (b NEAR/3 c))");
    }

    #[test]
    fn test_parse_precedence_not_over_near() {
        let node = parse_query("NOT a NEAR/2 b").unwrap();
        assert_eq!(node.to_string(), "(NOT a NEAR/2 b)");
        assert!(matches!(node, Node::Near { .. }));
    }

    #[test]
    fn test_parse_left_associative_chains() {
        let node = parse_query("a OR b OR c").unwrap();
        assert_eq!(node.to_string(), "((a OR b) OR c)");
        let node = parse_query("a AND b AND c AND d").unwrap();
        assert_eq!(node.to_string(), "(((a AND b) AND c) AND d)");
    }

    #[test]
    fn test_parse_grouping_overrides_precedence() {
        let node = parse_query("a AND (b OR c)").unwrap();
        assert_eq!(node.to_string(), "(a AND (b OR c))");
    }

    #[test]
    fn test_parse_ordered_near() {
        match parse_query("cancel NEAR/5/ORDERED subscription").unwrap() {
            Node::Near {
                distance, ordered, ..
            } => {
                assert_eq!(distance, 5);
                assert!(ordered);
            }
            other => panic!("Expected Near, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_double_not() {
        let node = parse_query("NOT NOT a").unwrap();
        assert!(node.same_structure(&Node::not(Node::not(Node::word("a")))));
    }

    #[test]
    fn test_parse_empty_query() {
        let err = parse_err("   ");
        assert_eq!(err.code, ErrorCode::EmptyQuery);
        assert_eq!(err.span, Span::new(0, 3));
    }

    #[test]
    fn test_parse_dangling_trailing_operator() {
        let err = parse_err("refund AND");
        assert_eq!(err.code, ErrorCode::DanglingOperator);
        assert_eq!(err.span, Span::new(7, 10));
    }

    #[test]
    fn test_parse_dangling_leading_operator() {
        let err = parse_err("OR refund");
        assert_eq!(err.code, ErrorCode::DanglingOperator);
        assert_eq!(err.span, Span::new(0, 2));
    }

    #[test]
    fn test_parse_dangling_operator_before_paren() {
        assert_eq!(parse_err("(a OR) b").code, ErrorCode::DanglingOperator);
        assert_eq!(parse_err("a AND NOT").code, ErrorCode::DanglingOperator);
    }

    #[test]
    fn test_parse_double_operator() {
        let err = parse_err("a AND OR b");
        assert_eq!(err.code, ErrorCode::UnexpectedToken);
        assert_eq!(err.span, Span::new(6, 8));
    }

    #[test]
    fn test_parse_adjacent_terms_rejected() {
        let err = parse_err("refund return");
        assert_eq!(err.code, ErrorCode::UnexpectedToken);
        assert_eq!(err.span, Span::new(7, 13));
    }

    #[test]
    fn test_parse_unclosed_paren() {
        let err = parse_err("(a OR b");
        assert_eq!(err.code, ErrorCode::UnbalancedParentheses);
        assert_eq!(err.span, Span::new(0, 1));
    }

    #[test]
    fn test_parse_unclosed_outer_paren() {
        let err = parse_err("((term1 AND term2)");
        assert_eq!(err.code, ErrorCode::UnbalancedParentheses);
        assert_eq!(err.span, Span::new(0, 1));
    }

    #[test]
    fn test_parse_unmatched_close_paren() {
        let err = parse_err("a OR b)");
        assert_eq!(err.code, ErrorCode::UnbalancedParentheses);
        assert_eq!(err.span, Span::new(6, 7));
        assert_eq!(parse_err(")").code, ErrorCode::UnbalancedParentheses);
    }

    #[test]
    fn test_parse_empty_group() {
        let err = parse_err("a AND ( )");
        assert_eq!(err.code, ErrorCode::EmptyGroup);
        assert_eq!(err.span, Span::new(6, 9));
    }

    #[test]
    fn test_parse_lone_open_paren() {
        assert_eq!(parse_err("(").code, ErrorCode::UnbalancedParentheses);
    }

    #[test]
    fn test_parse_invalid_near() {
        let err = parse_err("a NEAR/0 b");
        assert_eq!(err.code, ErrorCode::InvalidOperator);
        assert_eq!(err.span, Span::new(2, 8));
        assert_eq!(parse_err("a NEAR b").code, ErrorCode::InvalidOperator);
    }

    #[test]
    fn test_parse_chained_near_needs_parens() {
        assert_eq!(
            parse_err("a NEAR/2 b NEAR/3 c").code,
            ErrorCode::UnexpectedToken
        );
        assert!(parse_query("(a NEAR/2 b) NEAR/3 c").is_ok());
    }

    #[test]
    fn test_parse_nesting_guard() {
        let input = format!("{}a{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(parse_err(&input).code, ErrorCode::NestingTooDeep);
    }

    #[test]
    fn test_parse_unterminated_phrase_still_parses() {
        match parse_query("a OR \"open ended").unwrap() {
            Node::Or { right, .. } => match *right {
                Node::Phrase { words, .. } => assert_eq!(words, vec!["open", "ended"]),
                other => panic!("Expected Phrase, got {:?}", other),
            },
            other => panic!("Expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_to_validation_error() {
        let err = parse_err("a AND\n(b");
        let ve = err.to_validation_error("a AND\n(b");
        assert_eq!(ve.code, ErrorCode::UnbalancedParentheses);
        assert_eq!(ve.position.line, 2);
        assert_eq!(ve.position.column, 1);
    }

    #[test]
    fn test_parse_empty_token_slice() {
        assert_eq!(parse(&[]).unwrap_err().code, ErrorCode::EmptyQuery);
    }
}
