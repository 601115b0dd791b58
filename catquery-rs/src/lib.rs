//! catquery - a boolean/proximity query language for classifying call
//! transcripts into categories.
//!
//! # Overview
//!
//! Category queries combine words, quoted phrases and wildcards with
//! `AND`, `OR`, `NOT` and `NEAR/n`:
//!
//! ```text
//! (refund OR return*) AND NOT "very satisfied"
//! cancel* NEAR/5/ORDERED subscription
//! ```
//!
//! Query text is compiled once (parsed, validated, optimized) and the
//! resulting [`CompiledQuery`] is evaluated against tokenized transcripts.
//!
//! # Example
//!
//! ```
//! use catquery::{QueryOptions, Transcript, compile};
//!
//! let query = compile("refund OR return", QueryOptions::default()).unwrap();
//! let transcript = Transcript::from_text("I want a return");
//!
//! let result = query.evaluate(&transcript.tokens);
//! assert!(result.matched);
//! assert_eq!(result.terms(), vec!["return"]);
//! ```

pub mod category;
pub mod cli;
pub mod config;
pub mod error;
pub mod query;
pub mod transcript;

// Re-export main types at crate root
pub use category::{Categorizer, Category, CategoryFile, ClassificationReport};
pub use config::Config;
pub use error::{CatQueryError, Result};
pub use query::{
    CompiledQuery, ErrorCode, Limits, MatchResult, MatchSpan, Node, Query, QueryOptions,
    ValidationResult, compile, compile_with_limits, evaluate,
};
pub use transcript::{Transcript, TranscriptToken, tokenize_transcript};
