//! The category query language: lexing, parsing, validation, optimization
//! and evaluation against transcripts.

pub mod compile;
pub mod diagnostic;
pub mod evaluator;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod stemmer;
pub mod types;
pub mod validator;

pub use compile::{CompiledQuery, Query, compile, compile_with_limits, evaluate};
pub use diagnostic::{ErrorCode, Position, ValidationError, ValidationResult, ValidationWarning, WarningCode};
pub use lexer::{Token, TokenKind, normalize_whitespace, tokenize};
pub use optimizer::optimize;
pub use parser::{ParseError, parse, parse_query};
pub use stemmer::{IdentityStemmer, Stemmer, SuffixStemmer, stemmer_for};
pub use types::*;
pub use validator::{validate, validate_query};
