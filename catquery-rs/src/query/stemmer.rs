//! Pluggable word stemming.
//!
//! Stemming is opt-in per query. The built-in English stemmer only strips
//! common inflectional suffixes so that "refund", "refunds", "refunded" and
//! "refunding" compare equal; hosts that need a real morphological stemmer
//! can implement [`Stemmer`] themselves.

use crate::query::types::{Language, QueryOptions};
use std::borrow::Cow;

/// Reduces a (case-folded) word to the form used for comparison.
pub trait Stemmer: Send + Sync {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str>;
}

/// Leaves words untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityStemmer;

impl Stemmer for IdentityStemmer {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(word)
    }
}

/// Light English suffix stripper.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixStemmer;

/// Stems shorter than this are left alone ("is", "bed", "sing").
const MIN_STEM: usize = 3;

impl Stemmer for SuffixStemmer {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        let len = word.chars().count();

        if let Some(base) = word.strip_suffix("ies") {
            if len > MIN_STEM + 2 {
                return Cow::Owned(format!("{}y", base));
            }
        }
        for suffix in ["ing", "ed"] {
            if let Some(base) = word.strip_suffix(suffix) {
                if base.chars().count() >= MIN_STEM {
                    return Cow::Borrowed(base);
                }
            }
        }
        if let Some(base) = word.strip_suffix("es") {
            let sibilant = ["s", "x", "z", "ch", "sh"]
                .iter()
                .any(|s| base.ends_with(s));
            if sibilant && base.chars().count() >= MIN_STEM {
                return Cow::Borrowed(base);
            }
        }
        if let Some(base) = word.strip_suffix('s') {
            if !base.ends_with('s') && base.chars().count() >= MIN_STEM {
                return Cow::Borrowed(base);
            }
        }

        Cow::Borrowed(word)
    }
}

static IDENTITY: IdentityStemmer = IdentityStemmer;
static ENGLISH: SuffixStemmer = SuffixStemmer;

/// The built-in stemmer for a set of query options.
///
/// Only English has a built-in stemmer; other languages compare surface forms.
pub fn stemmer_for(options: &QueryOptions) -> &'static dyn Stemmer {
    match (options.enable_stemming, options.language) {
        (true, Language::English) => &ENGLISH,
        _ => &IDENTITY,
    }
}
