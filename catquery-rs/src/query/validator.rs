//! Structural validation of parsed queries.
//!
//! Validation never stops at the first problem: every rule runs and every
//! violation is reported, so an editor can mark all of them at once.

use crate::query::diagnostic::{ErrorCode, Position, ValidationResult, WarningCode};
use crate::query::lexer::{Token, TokenKind, tokenize};
use crate::query::parser::parse;
use crate::query::types::{Limits, Node, Span};

/// Wildcards need at least this many literal characters to stay selective.
const MIN_WILDCARD_PREFIX: usize = 2;

/// Validate a parsed tree against the query text it came from.
pub fn validate(ast: &Node, raw_text: &str, limits: &Limits) -> ValidationResult {
    let tokens = tokenize(raw_text);
    let mut result = ValidationResult::new();

    check_length(raw_text, limits, &mut result);
    check_quotes(raw_text, &tokens, &mut result);
    check_tree(ast, raw_text, &tokens, limits, &mut result);

    result
}

/// Lex, parse and validate a query, collecting every problem.
///
/// Returns the tree only when parsing succeeded; the tree may still have
/// validation errors, so check `is_valid` before using it.
pub fn validate_query(raw_text: &str, limits: &Limits) -> (Option<Node>, ValidationResult) {
    let tokens = tokenize(raw_text);
    let mut result = ValidationResult::new();

    check_length(raw_text, limits, &mut result);
    check_quotes(raw_text, &tokens, &mut result);

    match parse(&tokens) {
        Ok(ast) => {
            check_tree(&ast, raw_text, &tokens, limits, &mut result);
            (Some(ast), result)
        }
        Err(err) => {
            let error = err.to_validation_error(raw_text);
            result.error(error.code, error.message, error.position);
            if err.code != ErrorCode::NestingTooDeep {
                check_depth(paren_depth(&tokens), raw_text, limits, &mut result);
            }
            (None, result)
        }
    }
}

// ============================================================================
// Text-level rules
// ============================================================================

fn check_length(raw_text: &str, limits: &Limits, result: &mut ValidationResult) {
    let len = raw_text.chars().count();
    if len > limits.max_query_length {
        result.error(
            ErrorCode::QueryTooLong,
            format!(
                "Query is {} characters long; the limit is {}",
                len, limits.max_query_length
            ),
            Position::whole(raw_text),
        );
    }
}

fn check_quotes(raw_text: &str, tokens: &[Token], result: &mut ValidationResult) {
    for tok in tokens {
        if tok.kind == (TokenKind::Phrase { closed: false }) {
            result.error(
                ErrorCode::UnbalancedQuotes,
                "Phrase is missing its closing quote",
                Position::from_span(raw_text, Span::new(tok.position, tok.end)),
            );
        }
    }
}

/// Deepest parenthesis nesting in a token stream.
fn paren_depth(tokens: &[Token]) -> usize {
    let mut depth: usize = 0;
    let mut max = 0;
    for tok in tokens {
        match tok.kind {
            TokenKind::LParen => {
                depth += 1;
                max = max.max(depth);
            }
            TokenKind::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn check_depth(depth: usize, raw_text: &str, limits: &Limits, result: &mut ValidationResult) {
    if depth > limits.max_depth {
        result.error(
            ErrorCode::NestingTooDeep,
            format!(
                "Query is nested {} levels deep; the limit is {}",
                depth, limits.max_depth
            ),
            Position::whole(raw_text),
        );
    }
}

// ============================================================================
// Tree-level rules
// ============================================================================

fn check_tree(
    ast: &Node,
    raw_text: &str,
    tokens: &[Token],
    limits: &Limits,
    result: &mut ValidationResult,
) {
    ast.walk(&mut |node| check_node(node, raw_text, limits, result));

    let terms = ast.term_count();
    if terms > limits.max_terms {
        result.error(
            ErrorCode::TooManyTerms,
            format!(
                "Query has {} terms; the limit is {}",
                terms, limits.max_terms
            ),
            Position::whole(raw_text),
        );
    }

    check_depth(paren_depth(tokens).max(ast.depth()), raw_text, limits, result);

    if let Node::Not { .. } = ast {
        result.warning(
            WarningCode::NegationOnly,
            "Query only excludes terms and matches every transcript without them",
            Position::whole(raw_text),
        );
    }
}

fn check_node(node: &Node, raw_text: &str, limits: &Limits, result: &mut ValidationResult) {
    match node {
        Node::Word {
            text,
            has_wildcard,
            span,
        } => {
            let position = Position::from_span(raw_text, *span);
            if text.is_empty() {
                result.error(
                    ErrorCode::EmptyTerm,
                    "Wildcard '*' needs at least one character before it",
                    position,
                );
                return;
            }
            if *has_wildcard && text.chars().count() < MIN_WILDCARD_PREFIX {
                result.warning(
                    WarningCode::ShortWildcardPrefix,
                    format!("Wildcard '{}*' matches a very wide range of words", text),
                    position,
                );
            }
            if text.contains('*') {
                result.warning(
                    WarningCode::EmbeddedWildcard,
                    format!(
                        "'*' inside '{}' is matched literally; wildcards only work at the end of a word",
                        text
                    ),
                    position,
                );
            }
        }
        Node::Phrase { words, span } => {
            let position = Position::from_span(raw_text, *span);
            if words.is_empty() {
                result.error(ErrorCode::EmptyTerm, "Phrase is empty", position);
            } else if words.len() > limits.max_phrase_length {
                result.error(
                    ErrorCode::PhraseTooLong,
                    format!(
                        "Phrase has {} words; the limit is {}",
                        words.len(),
                        limits.max_phrase_length
                    ),
                    position,
                );
            }
        }
        Node::Not { operand } => {
            if let Node::Not { .. } = operand.as_ref() {
                let position = first_leaf_span(operand)
                    .map(|span| Position::from_span(raw_text, span))
                    .unwrap_or_else(|| Position::whole(raw_text));
                result.warning(
                    WarningCode::DoubleNegation,
                    "Double negation cancels out",
                    position,
                );
            }
        }
        Node::And { .. } | Node::Or { .. } | Node::Near { .. } => {}
    }
}

fn first_leaf_span(node: &Node) -> Option<Span> {
    let mut found = None;
    node.walk(&mut |n| {
        if found.is_none() {
            found = n.span();
        }
    });
    found
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_query;

    fn codes(input: &str) -> Vec<ErrorCode> {
        validate_query(input, &Limits::default()).1.codes()
    }

    fn warnings(input: &str) -> Vec<WarningCode> {
        validate_query(input, &Limits::default())
            .1
            .warnings
            .iter()
            .map(|w| w.code)
            .collect()
    }

    #[test]
    fn test_valid_query() {
        let (ast, result) = validate_query("refund OR (cancel NEAR/5 subscription)", &Limits::default());
        assert!(ast.is_some());
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unbalanced_parens_single_error() {
        assert_eq!(codes("((term1 AND term2)"), vec![ErrorCode::UnbalancedParentheses]);
        assert_eq!(codes("(a OR b"), vec![ErrorCode::UnbalancedParentheses]);
    }

    #[test]
    fn test_unbalanced_quotes() {
        let (ast, result) = validate_query("refund AND \"money back", &Limits::default());
        assert!(ast.is_some());
        assert_eq!(result.codes(), vec![ErrorCode::UnbalancedQuotes]);
        let pos = result.errors[0].position;
        assert_eq!((pos.start, pos.end), (11, 22));
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(codes(""), vec![ErrorCode::EmptyQuery]);
        assert_eq!(codes(" \n\t"), vec![ErrorCode::EmptyQuery]);
    }

    #[test]
    fn test_empty_terms() {
        assert_eq!(codes("*"), vec![ErrorCode::EmptyTerm]);
        assert_eq!(codes("\"\" OR a"), vec![ErrorCode::EmptyTerm]);
    }

    #[test]
    fn test_collects_multiple_errors() {
        let limits = Limits {
            max_phrase_length: 2,
            ..Limits::default()
        };
        let (_, result) = validate_query("* AND \"one two three\" AND \"", &limits);
        assert_eq!(
            result.codes(),
            vec![
                ErrorCode::UnbalancedQuotes,
                ErrorCode::EmptyTerm,
                ErrorCode::PhraseTooLong,
                ErrorCode::EmptyTerm,
            ]
        );
    }

    #[test]
    fn test_query_length_boundary() {
        let exact = "a".repeat(10_000);
        assert!(codes(&exact).is_empty());

        let over = "a".repeat(10_001);
        assert_eq!(codes(&over), vec![ErrorCode::QueryTooLong]);
    }

    #[test]
    fn test_length_counts_characters() {
        let limits = Limits {
            max_query_length: 4,
            ..Limits::default()
        };
        assert!(validate_query("café", &limits).1.is_valid);
    }

    #[test]
    fn test_too_many_terms() {
        let limits = Limits {
            max_terms: 3,
            ..Limits::default()
        };
        assert!(validate_query("a OR b OR c", &limits).1.is_valid);
        let (_, result) = validate_query("a OR b OR \"c d\" OR e", &limits);
        assert_eq!(result.codes(), vec![ErrorCode::TooManyTerms]);
        assert!(result.errors[0].message.contains("limit is 3"));
    }

    #[test]
    fn test_nesting_by_parentheses() {
        let ten = format!("{}a{}", "(".repeat(10), ")".repeat(10));
        assert!(codes(&ten).is_empty());
        let eleven = format!("{}a{}", "(".repeat(11), ")".repeat(11));
        assert_eq!(codes(&eleven), vec![ErrorCode::NestingTooDeep]);
    }

    #[test]
    fn test_nesting_by_operators() {
        let limits = Limits {
            max_depth: 2,
            ..Limits::default()
        };
        assert!(validate_query("a OR b OR c OR d OR e", &limits).1.is_valid);
        let (_, result) = validate_query("NOT a AND b NEAR/2 c OR d", &limits);
        // OR -> AND -> NEAR
        assert_eq!(result.codes(), vec![ErrorCode::NestingTooDeep]);
    }

    #[test]
    fn test_parser_nesting_guard_reports_once() {
        let deep = format!("{}a{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(codes(&deep), vec![ErrorCode::NestingTooDeep]);
    }

    #[test]
    fn test_parse_error_combined_with_length() {
        let limits = Limits {
            max_query_length: 5,
            ..Limits::default()
        };
        let (ast, result) = validate_query("refund AND", &limits);
        assert!(ast.is_none());
        assert_eq!(
            result.codes(),
            vec![ErrorCode::QueryTooLong, ErrorCode::DanglingOperator]
        );
    }

    #[test]
    fn test_positions_within_bounds() {
        for input in ["(a OR b", "a AND", "\"x", "()", "a b", "NEAR/0 x", ")"] {
            let (_, result) = validate_query(input, &Limits::default());
            let len = input.chars().count();
            for err in &result.errors {
                assert!(err.position.start <= err.position.end, "{}", input);
                assert!(err.position.end <= len, "{}", input);
            }
        }
    }

    #[test]
    fn test_validate_parsed_tree() {
        let raw = "refund* AND NOT x*";
        let ast = parse_query(raw).unwrap();
        let result = validate(&ast, raw, &Limits::default());
        assert!(result.is_valid);
        assert_eq!(
            result.warnings.iter().map(|w| w.code).collect::<Vec<_>>(),
            vec![WarningCode::ShortWildcardPrefix]
        );
        assert_eq!(result.warnings[0].position.start, 16);
    }

    #[test]
    fn test_warnings() {
        assert_eq!(warnings("NOT refund"), vec![WarningCode::NegationOnly]);
        assert_eq!(
            warnings("a AND NOT NOT b"),
            vec![WarningCode::DoubleNegation]
        );
        assert_eq!(warnings("re*und"), vec![WarningCode::EmbeddedWildcard]);
        assert!(warnings("refund*").is_empty());
    }
}
