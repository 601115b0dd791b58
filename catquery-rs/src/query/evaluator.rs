//! Evaluation of a query AST against a tokenized transcript.
//!
//! Evaluation is pure: the same tree, tokens and options always give the
//! same result. Trees must have passed validation; an empty word or phrase
//! is a caller bug and simply never matches.

use crate::query::stemmer::{Stemmer, stemmer_for};
use crate::query::types::{MatchResult, MatchSpan, Node, QueryOptions};
use crate::transcript::TranscriptToken;
use unicode_normalization::UnicodeNormalization;

/// Evaluate `ast` against transcript tokens using the built-in stemmer for `options`.
pub fn evaluate(ast: &Node, transcript: &[TranscriptToken], options: &QueryOptions) -> MatchResult {
    evaluate_with(ast, transcript, options, stemmer_for(options))
}

/// Evaluate with a caller-supplied stemmer.
///
/// The stemmer is applied whenever it is given, regardless of
/// `options.enable_stemming`.
pub fn evaluate_with(
    ast: &Node,
    transcript: &[TranscriptToken],
    options: &QueryOptions,
    stemmer: &dyn Stemmer,
) -> MatchResult {
    let evaluator = Evaluator::new(transcript, options, stemmer);
    let outcome = evaluator.eval(ast);

    if !outcome.matched {
        return MatchResult::default();
    }

    let mut spans: Vec<MatchSpan> = outcome
        .hits
        .into_iter()
        .flat_map(|hit| hit.spans)
        .collect();
    spans.sort();
    spans.dedup();

    MatchResult {
        matched: true,
        spans,
    }
}

// ============================================================================
// Internals
// ============================================================================

/// Half-open range of transcript token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Occurrence {
    start: usize,
    end: usize,
}

impl Occurrence {
    /// Number of tokens strictly between two occurrences (0 if they overlap).
    fn gap(self, other: Occurrence) -> usize {
        if self.end <= other.start {
            other.start - self.end
        } else if other.end <= self.start {
            self.start - other.end
        } else {
            0
        }
    }

    fn merge(self, other: Occurrence) -> Occurrence {
        Occurrence {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Whether `left` and `right` satisfy a proximity window.
fn within(left: Occurrence, right: Occurrence, distance: u32, ordered: bool) -> bool {
    if ordered && left.start > right.start {
        return false;
    }
    left.gap(right) <= distance as usize
}

#[derive(Debug, Clone)]
struct Hit {
    occurrence: Occurrence,
    spans: Vec<MatchSpan>,
}

#[derive(Debug, Clone, Default)]
struct Outcome {
    matched: bool,
    hits: Vec<Hit>,
}

impl Outcome {
    fn from_hits(hits: Vec<Hit>) -> Self {
        Self {
            matched: !hits.is_empty(),
            hits,
        }
    }
}

struct PreparedToken {
    /// NFC-normalized, lowercased unless case-sensitive.
    folded: String,
    stemmed: String,
}

struct Evaluator<'s> {
    tokens: Vec<PreparedToken>,
    case_sensitive: bool,
    stemmer: &'s dyn Stemmer,
}

impl<'s> Evaluator<'s> {
    fn new(transcript: &[TranscriptToken], options: &QueryOptions, stemmer: &'s dyn Stemmer) -> Self {
        let tokens = transcript
            .iter()
            .map(|tok| {
                let folded = fold(&tok.text, options.case_sensitive);
                let stemmed = stemmer.stem(&folded).into_owned();
                PreparedToken { folded, stemmed }
            })
            .collect();

        Self {
            tokens,
            case_sensitive: options.case_sensitive,
            stemmer,
        }
    }

    fn eval(&self, node: &Node) -> Outcome {
        match node {
            Node::Word {
                text, has_wildcard, ..
            } => Outcome::from_hits(self.word_hits(text, *has_wildcard)),
            Node::Phrase { words, .. } => Outcome::from_hits(self.phrase_hits(words)),
            Node::And { left, right } => {
                let l = self.eval(left);
                if !l.matched {
                    return Outcome::default();
                }
                let r = self.eval(right);
                if !r.matched {
                    return Outcome::default();
                }
                Outcome {
                    matched: true,
                    hits: union(l.hits, r.hits),
                }
            }
            Node::Or { left, right } => {
                let l = self.eval(left);
                let r = self.eval(right);
                match (l.matched, r.matched) {
                    (true, true) => Outcome {
                        matched: true,
                        hits: union(l.hits, r.hits),
                    },
                    (true, false) => l,
                    (false, true) => r,
                    (false, false) => Outcome::default(),
                }
            }
            Node::Not { operand } => Outcome {
                matched: !self.eval(operand).matched,
                hits: Vec::new(),
            },
            Node::Near {
                left,
                right,
                distance,
                ordered,
            } => self.eval_near(left, right, *distance, *ordered),
        }
    }

    fn eval_near(&self, left: &Node, right: &Node, distance: u32, ordered: bool) -> Outcome {
        let (left, right) = (strip_double_not(left), strip_double_not(right));
        match (left, right) {
            // Neither side may occur near the other.
            (Node::Not { operand: l }, Node::Not { operand: r }) => {
                let l = self.eval(l);
                let r = self.eval(r);
                let any_pair = l.hits.iter().any(|lh| {
                    r.hits
                        .iter()
                        .any(|rh| within(lh.occurrence, rh.occurrence, distance, ordered))
                });
                Outcome {
                    matched: !any_pair,
                    hits: Vec::new(),
                }
            }
            // Some right occurrence without an excluded term in its window.
            (Node::Not { operand: excluded }, positive) => {
                let excluded = self.eval(excluded);
                let hits = self
                    .eval(positive)
                    .hits
                    .into_iter()
                    .filter(|hit| {
                        !excluded
                            .hits
                            .iter()
                            .any(|x| within(x.occurrence, hit.occurrence, distance, ordered))
                    })
                    .collect();
                Outcome::from_hits(hits)
            }
            // Some left occurrence without an excluded term in its window.
            (positive, Node::Not { operand: excluded }) => {
                let excluded = self.eval(excluded);
                let hits = self
                    .eval(positive)
                    .hits
                    .into_iter()
                    .filter(|hit| {
                        !excluded
                            .hits
                            .iter()
                            .any(|x| within(hit.occurrence, x.occurrence, distance, ordered))
                    })
                    .collect();
                Outcome::from_hits(hits)
            }
            _ => {
                let l = self.eval(left);
                if !l.matched {
                    return Outcome::default();
                }
                let r = self.eval(right);
                let mut hits = Vec::new();
                for lh in &l.hits {
                    for rh in &r.hits {
                        if within(lh.occurrence, rh.occurrence, distance, ordered) {
                            let mut spans = lh.spans.clone();
                            spans.extend(rh.spans.iter().cloned());
                            hits.push(Hit {
                                occurrence: lh.occurrence.merge(rh.occurrence),
                                spans,
                            });
                        }
                    }
                }
                Outcome::from_hits(hits)
            }
        }
    }

    fn word_hits(&self, text: &str, has_wildcard: bool) -> Vec<Hit> {
        if text.is_empty() {
            return Vec::new();
        }

        let term = if has_wildcard {
            format!("{}*", text)
        } else {
            text.to_string()
        };
        let pattern = fold(text, self.case_sensitive);

        let is_match: Box<dyn Fn(&PreparedToken) -> bool + '_> = if has_wildcard || pattern.contains('?') {
            let chars: Vec<char> = pattern.chars().collect();
            Box::new(move |tok: &PreparedToken| glob_match(&chars, &tok.folded, has_wildcard))
        } else {
            let stem = self.stemmer.stem(&pattern).into_owned();
            Box::new(move |tok: &PreparedToken| tok.stemmed == stem)
        };

        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, tok)| is_match(tok))
            .map(|(i, _)| leaf_hit(i, i + 1, &term))
            .collect()
    }

    fn phrase_hits(&self, words: &[String]) -> Vec<Hit> {
        let k = words.len();
        if k == 0 || k > self.tokens.len() {
            return Vec::new();
        }

        let stems: Vec<String> = words
            .iter()
            .map(|w| self.stemmer.stem(&fold(w, self.case_sensitive)).into_owned())
            .collect();
        let term = words.join(" ");

        (0..=self.tokens.len() - k)
            .filter(|&i| {
                stems
                    .iter()
                    .zip(&self.tokens[i..i + k])
                    .all(|(stem, tok)| *stem == tok.stemmed)
            })
            .map(|i| leaf_hit(i, i + k, &term))
            .collect()
    }
}

fn leaf_hit(start: usize, end: usize, term: &str) -> Hit {
    Hit {
        occurrence: Occurrence { start, end },
        spans: vec![MatchSpan {
            start,
            end,
            term: term.to_string(),
        }],
    }
}

fn union(mut left: Vec<Hit>, right: Vec<Hit>) -> Vec<Hit> {
    left.extend(right);
    left
}

/// Drop pairs of `Not` wrappers so a NEAR operand is either positive or
/// negated exactly once.
fn strip_double_not(node: &Node) -> &Node {
    let mut node = node;
    while let Node::Not { operand } = node {
        match operand.as_ref() {
            Node::Not { operand: inner } => node = inner,
            _ => break,
        }
    }
    node
}

/// Normalize text for comparison.
pub(crate) fn fold(text: &str, case_sensitive: bool) -> String {
    let normalized: String = text.nfc().collect();
    if case_sensitive {
        normalized
    } else {
        normalized.to_lowercase()
    }
}

/// Anchored match of a `?`-pattern against a whole token, optionally allowing
/// any trailing characters.
fn glob_match(pattern: &[char], text: &str, trailing_wildcard: bool) -> bool {
    let mut chars = text.chars();
    for &p in pattern {
        match chars.next() {
            Some(c) if p == '?' || p == c => {}
            _ => return false,
        }
    }
    trailing_wildcard || chars.next().is_none()
}

// ============================================================================
// Tests
// ============================================================================
