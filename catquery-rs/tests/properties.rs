//! Property tests for the lexer and parser.

use catquery::query::{Node, normalize_whitespace, parse_query, tokenize};
use proptest::prelude::*;

const KEYWORDS: [&str; 4] = ["and", "or", "not", "near"];

fn plain_word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_filter("operator keyword", |w| !KEYWORDS.contains(&w.as_str()))
}

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        3 => (plain_word(), any::<bool>()).prop_map(|(w, wildcard)| {
            if wildcard {
                Node::word(&format!("{}*", w))
            } else {
                Node::word(&w)
            }
        }),
        1 => prop::collection::vec(plain_word(), 1..4).prop_map(|words| Node::phrase(&words.join(" "))),
    ]
}

fn tree() -> impl Strategy<Value = Node> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Node::and(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Node::or(l, r)),
            inner.clone().prop_map(Node::not),
            (inner.clone(), inner, 1u32..20, any::<bool>())
                .prop_map(|(l, r, d, ordered)| Node::near(l, r, d, ordered)),
        ]
    })
}

proptest! {
    #[test]
    fn simple_words_round_trip(words in prop::collection::vec(plain_word(), 1..10), sep in "[ \t\n]{1,3}") {
        let input = format!("  {}  ", words.join(&sep));
        let joined: Vec<String> = tokenize(&input)
            .into_iter()
            .filter(|t| !t.text.is_empty())
            .map(|t| t.text)
            .collect();
        prop_assert_eq!(joined.join(" "), normalize_whitespace(&input));
    }

    #[test]
    fn normalize_is_idempotent(input in "\\PC*") {
        let once = normalize_whitespace(&input);
        prop_assert_eq!(normalize_whitespace(&once), once);
    }

    #[test]
    fn display_reparses_to_same_tree(ast in tree()) {
        let rendered = ast.to_string();
        let reparsed = parse_query(&rendered);
        prop_assert!(reparsed.is_ok(), "{} failed: {:?}", rendered, reparsed);
        prop_assert!(reparsed.unwrap().same_structure(&ast), "{}", rendered);
    }

    #[test]
    fn tokenize_never_panics(input in "\\PC{0,64}") {
        let tokens = tokenize(&input);
        prop_assert!(!tokens.is_empty());
        let len = input.chars().count();
        for token in &tokens {
            prop_assert!(token.position <= token.end);
            prop_assert!(token.end <= len);
        }
    }
}
