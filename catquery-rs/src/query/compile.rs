//! Compile API and the query lifecycle.
//!
//! A [`CompiledQuery`] only exists for text that passed validation, so
//! evaluation never sees a partially validated tree.

use crate::query::diagnostic::{ValidationResult, ValidationWarning};
use crate::query::evaluator;
use crate::query::optimizer::optimize;
use crate::query::stemmer::Stemmer;
use crate::query::types::{Limits, MatchResult, Node, QueryOptions};
use crate::query::validator::validate_query;
use crate::transcript::TranscriptToken;
use serde::Serialize;
use std::sync::Arc;

/// A validated, optimized query ready for evaluation.
///
/// Cloning is cheap; the tree is shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    pub raw_text: String,
    pub options: QueryOptions,
    pub ast: Arc<Node>,
    pub warnings: Vec<ValidationWarning>,
}

impl CompiledQuery {
    pub fn evaluate(&self, transcript: &[TranscriptToken]) -> MatchResult {
        evaluator::evaluate(&self.ast, transcript, &self.options)
    }

    /// Evaluate with a host-provided stemmer instead of the built-in one.
    pub fn evaluate_with(&self, transcript: &[TranscriptToken], stemmer: &dyn Stemmer) -> MatchResult {
        evaluator::evaluate_with(&self.ast, transcript, &self.options, stemmer)
    }
}

/// Compile query text with the default limits.
pub fn compile(raw_text: &str, options: QueryOptions) -> Result<CompiledQuery, ValidationResult> {
    compile_with_limits(raw_text, options, &Limits::default())
}

/// Parse, validate and optimize query text.
///
/// Returns every validation error found when the query is rejected.
pub fn compile_with_limits(
    raw_text: &str,
    options: QueryOptions,
    limits: &Limits,
) -> Result<CompiledQuery, ValidationResult> {
    let (ast, result) = validate_query(raw_text, limits);

    let ast = match ast {
        Some(ast) if result.is_valid => ast,
        _ => {
            tracing::debug!(query = raw_text, errors = %result, "query rejected");
            return Err(result);
        }
    };

    let optimized = optimize(ast);
    tracing::debug!(query = raw_text, tree = %optimized, "query compiled");

    Ok(CompiledQuery {
        raw_text: raw_text.to_string(),
        options,
        ast: Arc::new(optimized),
        warnings: result.warnings,
    })
}

/// Evaluate a compiled query against transcript tokens.
pub fn evaluate(compiled: &CompiledQuery, transcript: &[TranscriptToken]) -> MatchResult {
    compiled.evaluate(transcript)
}

/// User-editable query text plus its last successful compilation.
#[derive(Debug, Clone, Default)]
pub struct Query {
    raw_text: String,
    options: QueryOptions,
    compiled: Option<Arc<CompiledQuery>>,
}

impl Query {
    pub fn new(raw_text: impl Into<String>, options: QueryOptions) -> Self {
        Self {
            raw_text: raw_text.into(),
            options,
            compiled: None,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Replace the text; the previous compilation no longer applies.
    pub fn set_text(&mut self, raw_text: impl Into<String>) {
        self.raw_text = raw_text.into();
        self.compiled = None;
    }

    /// Replace the options; the previous compilation no longer applies.
    pub fn set_options(&mut self, options: QueryOptions) {
        self.options = options;
        self.compiled = None;
    }

    /// Compile the current text, replacing any previous compilation.
    ///
    /// On failure the query is left uncompiled.
    pub fn compile(&mut self, limits: &Limits) -> Result<Arc<CompiledQuery>, ValidationResult> {
        match compile_with_limits(&self.raw_text, self.options, limits) {
            Ok(compiled) => {
                let compiled = Arc::new(compiled);
                self.compiled = Some(Arc::clone(&compiled));
                Ok(compiled)
            }
            Err(result) => {
                self.compiled = None;
                Err(result)
            }
        }
    }

    /// The current compilation, if the text has been compiled since its last edit.
    pub fn compiled(&self) -> Option<&Arc<CompiledQuery>> {
        self.compiled.as_ref()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }
}
