//! Query AST, options, and result types for category queries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default maximum query length, in characters.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 10_000;
/// Default maximum number of leaf terms (words + phrases).
pub const DEFAULT_MAX_TERMS: usize = 500;
/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 10;
/// Default maximum number of words in a single phrase.
pub const DEFAULT_MAX_PHRASE_LENGTH: usize = 100;

/// Half-open character-offset range into the source query text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A query AST node.
///
/// Leaf nodes remember where they came from in the query text so the
/// validator can point at them; structural comparisons should go through
/// [`Node::same_structure`], which ignores spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// A single word, optionally ending in a `*` wildcard (stripped from `text`).
    Word {
        text: String,
        has_wildcard: bool,
        #[serde(default)]
        span: Span,
    },
    /// An exact, contiguous sequence of words.
    Phrase {
        words: Vec<String>,
        #[serde(default)]
        span: Span,
    },
    /// Both children must match.
    And { left: Box<Node>, right: Box<Node> },
    /// At least one child must match.
    Or { left: Box<Node>, right: Box<Node> },
    /// The operand must NOT match.
    Not { operand: Box<Node> },
    /// Both children must match within `distance` words of each other.
    Near {
        left: Box<Node>,
        right: Box<Node>,
        distance: u32,
        ordered: bool,
    },
}

impl Node {
    /// Build a word node from query text; a trailing `*` becomes the wildcard flag.
    pub fn word(text: &str) -> Self {
        Self::word_at(text, Span::default())
    }

    pub(crate) fn word_at(text: &str, span: Span) -> Self {
        match text.strip_suffix('*') {
            Some(stem) => Node::Word {
                text: stem.to_string(),
                has_wildcard: true,
                span,
            },
            None => Node::Word {
                text: text.to_string(),
                has_wildcard: false,
                span,
            },
        }
    }

    /// Build a phrase node from whitespace-separated text.
    pub fn phrase(text: &str) -> Self {
        Self::phrase_at(text, Span::default())
    }

    pub(crate) fn phrase_at(text: &str, span: Span) -> Self {
        Node::Phrase {
            words: text.split_whitespace().map(str::to_string).collect(),
            span,
        }
    }

    pub fn and(left: Node, right: Node) -> Self {
        Node::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Node) -> Self {
        Node::Not {
            operand: Box::new(operand),
        }
    }

    pub fn near(left: Node, right: Node, distance: u32, ordered: bool) -> Self {
        Node::Near {
            left: Box::new(left),
            right: Box::new(right),
            distance,
            ordered,
        }
    }

    /// Whether this node is a word or phrase.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Word { .. } | Node::Phrase { .. })
    }

    /// Source span for leaf nodes.
    pub fn span(&self) -> Option<Span> {
        match self {
            Node::Word { span, .. } | Node::Phrase { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Number of leaf terms (words + phrases) in the tree.
    pub fn term_count(&self) -> usize {
        match self {
            Node::Word { .. } | Node::Phrase { .. } => 1,
            Node::And { left, right } | Node::Or { left, right } | Node::Near { left, right, .. } => {
                left.term_count() + right.term_count()
            }
            Node::Not { operand } => operand.term_count(),
        }
    }

    /// Operator nesting depth.
    ///
    /// Counts operator nodes on the longest root-to-leaf path, except that an
    /// AND directly under an AND (or OR under OR) does not add a level: a flat
    /// `a OR b OR c OR ...` chain is one level deep however long it is.
    /// Counting every binary node instead would make any query near the term
    /// limit exceed the depth limit, so the two limits could not both hold.
    pub fn depth(&self) -> usize {
        self.depth_under(None)
    }

    fn depth_under(&self, parent: Option<ChainKind>) -> usize {
        let kind = self.chain_kind();
        let own = if kind.is_some() && kind == parent { 0 } else { 1 };
        match self {
            Node::Word { .. } | Node::Phrase { .. } => 0,
            Node::And { left, right } | Node::Or { left, right } => {
                own + left.depth_under(kind).max(right.depth_under(kind))
            }
            Node::Near { left, right, .. } => 1 + left.depth_under(None).max(right.depth_under(None)),
            Node::Not { operand } => 1 + operand.depth_under(None),
        }
    }

    fn chain_kind(&self) -> Option<ChainKind> {
        match self {
            Node::And { .. } => Some(ChainKind::And),
            Node::Or { .. } => Some(ChainKind::Or),
            _ => None,
        }
    }

    /// Structural equality, ignoring source spans.
    pub fn same_structure(&self, other: &Node) -> bool {
        match (self, other) {
            (
                Node::Word {
                    text: a,
                    has_wildcard: wa,
                    ..
                },
                Node::Word {
                    text: b,
                    has_wildcard: wb,
                    ..
                },
            ) => a == b && wa == wb,
            (Node::Phrase { words: a, .. }, Node::Phrase { words: b, .. }) => a == b,
            (Node::And { left: l1, right: r1 }, Node::And { left: l2, right: r2 })
            | (Node::Or { left: l1, right: r1 }, Node::Or { left: l2, right: r2 }) => {
                l1.same_structure(l2) && r1.same_structure(r2)
            }
            (Node::Not { operand: a }, Node::Not { operand: b }) => a.same_structure(b),
            (
                Node::Near {
                    left: l1,
                    right: r1,
                    distance: d1,
                    ordered: o1,
                },
                Node::Near {
                    left: l2,
                    right: r2,
                    distance: d2,
                    ordered: o2,
                },
            ) => d1 == d2 && o1 == o2 && l1.same_structure(l2) && r1.same_structure(r2),
            _ => false,
        }
    }

    /// Visit every node in the tree, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        match self {
            Node::Word { .. } | Node::Phrase { .. } => {}
            Node::And { left, right } | Node::Or { left, right } | Node::Near { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Node::Not { operand } => operand.walk(visit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainKind {
    And,
    Or,
}

/// Renders a query string that parses back to a structurally equal tree.
///
/// Binary operators are always parenthesized.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Word {
                text, has_wildcard, ..
            } => {
                write!(f, "{}", text)?;
                if *has_wildcard {
                    write!(f, "*")?;
                }
                Ok(())
            }
            Node::Phrase { words, .. } => write!(f, "\"{}\"", words.join(" ")),
            Node::And { left, right } => write!(f, "({} AND {})", left, right),
            Node::Or { left, right } => write!(f, "({} OR {})", left, right),
            Node::Not { operand } => match operand.as_ref() {
                Node::Not { .. } => write!(f, "NOT ({})", operand),
                _ => write!(f, "NOT {}", operand),
            },
            Node::Near {
                left,
                right,
                distance,
                ordered,
            } => {
                write!(f, "({} NEAR/{}", left, distance)?;
                if *ordered {
                    write!(f, "/ORDERED")?;
                }
                write!(f, " {})", right)
            }
        }
    }
}

/// Transcript language, used to pick a stemmer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Portuguese,
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "spanish" | "es" => Ok(Language::Spanish),
            "french" | "fr" => Ok(Language::French),
            "german" | "de" => Ok(Language::German),
            "portuguese" | "pt" => Ok(Language::Portuguese),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}

/// Matching options attached to a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Compare word stems instead of surface forms ("refund" matches "refunding").
    pub enable_stemming: bool,
    pub language: Language,
    pub case_sensitive: bool,
}

/// Structural limits enforced by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_query_length: usize,
    pub max_terms: usize,
    pub max_depth: usize,
    pub max_phrase_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            max_terms: DEFAULT_MAX_TERMS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_phrase_length: DEFAULT_MAX_PHRASE_LENGTH,
        }
    }
}

/// Where in a transcript a query term matched.
///
/// `start..end` is a half-open range of transcript token indices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    /// The query term that produced this span, as written in the query.
    pub term: String,
}

/// Result of evaluating one query against one transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    pub spans: Vec<MatchSpan>,
}

impl MatchResult {
    /// Distinct matched terms, in order of first appearance in the transcript.
    pub fn terms(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for span in &self.spans {
            if !seen.contains(&span.term.as_str()) {
                seen.push(&span.term);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_strips_trailing_wildcard() {
        match Node::word("refund*") {
            Node::Word {
                text, has_wildcard, ..
            } => {
                assert_eq!(text, "refund");
                assert!(has_wildcard);
            }
            other => panic!("Expected Word, got {:?}", other),
        }
    }

    #[test]
    fn test_word_keeps_question_mark() {
        match Node::word("c?ll") {
            Node::Word {
                text, has_wildcard, ..
            } => {
                assert_eq!(text, "c?ll");
                assert!(!has_wildcard);
            }
            other => panic!("Expected Word, got {:?}", other),
        }
    }

    #[test]
    fn test_display_parenthesizes_binary_nodes() {
        let node = Node::or(Node::and(Node::word("a"), Node::word("b")), Node::word("c"));
        assert_eq!(node.to_string(), "((a AND b) OR c)");
    }

    #[test]
    fn test_display_near_and_not() {
        let node = Node::near(
            Node::phrase("cancel my"),
            Node::not(Node::not(Node::word("plan*"))),
            4,
            true,
        );
        assert_eq!(node.to_string(), "(\"cancel my\" NEAR/4/ORDERED NOT (NOT plan*))");
    }

    #[test]
    fn test_term_count() {
        let node = Node::and(
            Node::phrase("a b c"),
            Node::not(Node::or(Node::word("x"), Node::word("y"))),
        );
        assert_eq!(node.term_count(), 3);
    }

    #[test]
    fn test_depth_flat_chain_is_one_level() {
        let mut node = Node::word("t0");
        for i in 1..20 {
            node = Node::or(node, Node::word(&format!("t{}", i)));
        }
        assert_eq!(node.depth(), 1);
    }

    #[test]
    fn test_depth_alternating_operators() {
        // (a OR (b AND (c OR d)))
        let node = Node::or(
            Node::word("a"),
            Node::and(Node::word("b"), Node::or(Node::word("c"), Node::word("d"))),
        );
        assert_eq!(node.depth(), 3);
        assert_eq!(Node::not(Node::not(Node::word("a"))).depth(), 2);
        assert_eq!(Node::word("a").depth(), 0);
    }

    #[test]
    fn test_same_structure_ignores_spans() {
        let a = Node::word_at("hello", Span::new(0, 5));
        let b = Node::word_at("hello", Span::new(10, 15));
        assert_ne!(a, b);
        assert!(a.same_structure(&b));
        assert!(!a.same_structure(&Node::word("hello*")));
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::English));
        assert_eq!("spanish".parse::<Language>(), Ok(Language::Spanish));
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: QueryOptions = serde_json::from_str(r#"{"case_sensitive": true}"#).unwrap();
        assert!(opts.case_sensitive);
        assert!(!opts.enable_stemming);
        assert_eq!(opts.language, Language::English);
    }

    #[test]
    fn test_match_result_terms_dedup() {
        let result = MatchResult {
            matched: true,
            spans: vec![
                MatchSpan { start: 1, end: 2, term: "refund".into() },
                MatchSpan { start: 4, end: 5, term: "return".into() },
                MatchSpan { start: 7, end: 8, term: "refund".into() },
            ],
        };
        assert_eq!(result.terms(), vec!["refund", "return"]);
    }
}
