//! Semantics-preserving AST simplification.

use crate::query::types::Node;
use tracing::{Level, debug, enabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    And,
    Or,
}

impl Chain {
    fn join(self, left: Node, right: Node) -> Node {
        match self {
            Chain::And => Node::and(left, right),
            Chain::Or => Node::or(left, right),
        }
    }

    fn of(node: &Node) -> Option<Chain> {
        match node {
            Node::And { .. } => Some(Chain::And),
            Node::Or { .. } => Some(Chain::Or),
            _ => None,
        }
    }
}

/// Simplify a tree without changing what it matches.
///
/// - `NOT NOT x` becomes `x`
/// - AND/OR chains are flattened, structurally duplicate operands dropped,
///   and the chain rebuilt left-associatively (`x OR x` becomes `x`)
/// - NEAR operands are simplified in place
pub fn optimize(node: Node) -> Node {
    if !enabled!(Level::DEBUG) {
        return simplify(node);
    }
    let before = node.to_string();
    let after = simplify(node);
    let rendered = after.to_string();
    if rendered != before {
        debug!(from = %before, to = %rendered, "query rewritten");
    }
    after
}

fn simplify(node: Node) -> Node {
    match node {
        Node::Not { operand } => match simplify(*operand) {
            Node::Not { operand: inner } => *inner,
            other => Node::not(other),
        },
        Node::And { .. } => rebuild_chain(node, Chain::And),
        Node::Or { .. } => rebuild_chain(node, Chain::Or),
        Node::Near {
            left,
            right,
            distance,
            ordered,
        } => Node::near(simplify(*left), simplify(*right), distance, ordered),
        leaf => leaf,
    }
}

fn rebuild_chain(node: Node, chain: Chain) -> Node {
    let mut operands = Vec::new();
    flatten_into(node, chain, &mut operands);

    let mut iter = operands.into_iter();
    match iter.next() {
        Some(first) => iter.fold(first, |acc, next| chain.join(acc, next)),
        None => unreachable!("a chain always has at least one operand"),
    }
}

fn flatten_into(node: Node, chain: Chain, out: &mut Vec<Node>) {
    match (chain, node) {
        (Chain::And, Node::And { left, right }) | (Chain::Or, Node::Or { left, right }) => {
            flatten_into(*left, chain, out);
            flatten_into(*right, chain, out);
        }
        (_, other) => {
            let simplified = simplify(other);
            if Chain::of(&simplified) == Some(chain) {
                // e.g. NOT NOT (a OR b) inside an OR chain
                flatten_into(simplified, chain, out);
            } else if !out.iter().any(|n| n.same_structure(&simplified)) {
                out.push(simplified);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_query;

    fn opt(input: &str) -> String {
        optimize(parse_query(input).unwrap()).to_string()
    }

    #[test]
    fn test_removes_double_negation() {
        assert_eq!(opt("NOT NOT refund"), "refund");
        assert_eq!(opt("NOT NOT NOT refund"), "NOT refund");
        assert_eq!(opt("NOT (NOT (a OR b))"), "(a OR b)");
    }

    #[test]
    fn test_collapses_duplicate_operands() {
        assert_eq!(opt("refund OR refund"), "refund");
        assert_eq!(opt("a AND b AND a"), "(a AND b)");
        // wildcard and literal are different terms
        assert_eq!(opt("a OR a*"), "(a OR a*)");
    }

    #[test]
    fn test_flattens_chains() {
        assert_eq!(opt("(a OR b) OR (b OR c)"), "((a OR b) OR c)");
        assert_eq!(opt("a AND (b AND c)"), "((a AND b) AND c)");
        assert_eq!(opt("a OR NOT NOT (b OR c)"), "((a OR b) OR c)");
    }

    #[test]
    fn test_keeps_mixed_operators() {
        assert_eq!(opt("a AND (b OR c)"), "(a AND (b OR c))");
        assert_eq!(opt("(a AND b) OR (a AND b)"), "(a AND b)");
    }

    #[test]
    fn test_optimizes_near_operands() {
        assert_eq!(
            opt("(x OR x) NEAR/3 NOT NOT y"),
            "(x NEAR/3 y)"
        );
    }

    #[test]
    fn test_leaves_simple_trees_alone() {
        assert_eq!(opt("\"a refund\""), "\"a refund\"");
        assert_eq!(opt("a NEAR/2/ORDERED b"), "(a NEAR/2/ORDERED b)");
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged(input: &str) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            optimize(parse_query(input).unwrap());
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_logs_rewrites_at_debug() {
        let log = logged("NOT NOT refund");
        assert!(log.contains("query rewritten"), "{}", log);
        assert!(log.contains("to=refund"), "{}", log);

        assert!(!logged("refund AND cancel").contains("query rewritten"));
    }
}
