//! Node.js bindings for catquery.
//!
//! Lets the category-management backend validate query text as users type
//! it and evaluate saved categories against transcripts.

#![deny(clippy::all)]

use napi::bindgen_prelude::*;
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use catquery::category::{Categorizer, Category};
use catquery::query::{
    CompiledQuery, Language, Limits, MatchResult, QueryOptions, TokenKind, ValidationError, ValidationResult,
    ValidationWarning, compile_with_limits, tokenize as lex, validate_query,
};
use catquery::transcript::{Transcript, tokenize_transcript};

// ============================================================================
// Types for JavaScript
// ============================================================================

#[napi(object)]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsQueryOptions {
    pub enable_stemming: Option<bool>,
    pub language: Option<String>,
    pub case_sensitive: Option<bool>,
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsToken {
    pub kind: String,
    pub text: String,
    pub position: u32,
    pub end: u32,
    pub distance: Option<u32>,
    pub ordered: Option<bool>,
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsDiagnostic {
    pub code: String,
    pub message: String,
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsValidationResult {
    pub is_valid: bool,
    pub errors: Vec<JsDiagnostic>,
    pub warnings: Vec<JsDiagnostic>,
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsMatchSpan {
    pub start: u32,
    pub end: u32,
    pub term: String,
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsMatchResult {
    pub matched: bool,
    pub terms: Vec<String>,
    pub spans: Vec<JsMatchSpan>,
}

#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsCategoryMatch {
    pub category: String,
    pub spans: Vec<JsMatchSpan>,
}

// ============================================================================
// Conversions
// ============================================================================

fn to_options(options: Option<JsQueryOptions>) -> Result<QueryOptions> {
    let options = options.unwrap_or_default();
    let mut resolved = QueryOptions::default();
    if let Some(stemming) = options.enable_stemming {
        resolved.enable_stemming = stemming;
    }
    if let Some(case_sensitive) = options.case_sensitive {
        resolved.case_sensitive = case_sensitive;
    }
    if let Some(language) = options.language {
        resolved.language = language.parse::<Language>().map_err(Error::from_reason)?;
    }
    Ok(resolved)
}

fn error_diagnostic(e: &ValidationError) -> JsDiagnostic {
    JsDiagnostic {
        code: e.code.to_string(),
        message: e.message.clone(),
        start: e.position.start as u32,
        end: e.position.end as u32,
        line: e.position.line as u32,
        column: e.position.column as u32,
    }
}

fn warning_diagnostic(w: &ValidationWarning) -> JsDiagnostic {
    let code = serde_json::to_value(w.code)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();
    JsDiagnostic {
        code,
        message: w.message.clone(),
        start: w.position.start as u32,
        end: w.position.end as u32,
        line: w.position.line as u32,
        column: w.position.column as u32,
    }
}

fn to_js_result(result: &ValidationResult) -> JsValidationResult {
    JsValidationResult {
        is_valid: result.is_valid,
        errors: result.errors.iter().map(error_diagnostic).collect(),
        warnings: result.warnings.iter().map(warning_diagnostic).collect(),
    }
}

fn to_js_spans(spans: &[catquery::MatchSpan]) -> Vec<JsMatchSpan> {
    spans
        .iter()
        .map(|s| JsMatchSpan {
            start: s.start as u32,
            end: s.end as u32,
            term: s.term.clone(),
        })
        .collect()
}

fn to_js_match(result: &MatchResult) -> JsMatchResult {
    JsMatchResult {
        matched: result.matched,
        terms: result.terms().into_iter().map(String::from).collect(),
        spans: to_js_spans(&result.spans),
    }
}

fn invalid_query(result: &ValidationResult) -> Error {
    let detail = serde_json::to_string(&to_js_result(result)).unwrap_or_else(|_| result.to_string());
    Error::new(Status::InvalidArg, detail)
}

// ============================================================================
// CompiledQuery Class
// ============================================================================

#[napi]
pub struct JsCompiledQuery {
    compiled: Arc<CompiledQuery>,
}

#[napi]
impl JsCompiledQuery {
    /// The query text as written.
    #[napi(getter)]
    pub fn raw_text(&self) -> String {
        self.compiled.raw_text.clone()
    }

    /// The optimized tree, rendered back to query syntax.
    #[napi(getter)]
    pub fn tree(&self) -> String {
        self.compiled.ast.to_string()
    }

    #[napi(getter)]
    pub fn warnings(&self) -> Vec<JsDiagnostic> {
        self.compiled.warnings.iter().map(warning_diagnostic).collect()
    }

    /// The tree as JSON.
    #[napi]
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self.compiled.ast.as_ref()).map_err(|e| Error::from_reason(e.to_string()))
    }

    /// Evaluate against pre-split transcript words.
    #[napi]
    pub fn evaluate(&self, words: Vec<String>) -> JsMatchResult {
        let transcript = Transcript::from_words(&words);
        to_js_match(&self.compiled.evaluate(&transcript.tokens))
    }

    /// Evaluate against raw transcript text.
    #[napi]
    pub fn evaluate_text(&self, text: String) -> JsMatchResult {
        let transcript = Transcript::from_text(&text);
        to_js_match(&self.compiled.evaluate(&transcript.tokens))
    }
}

// ============================================================================
// Categorizer Class
// ============================================================================

#[napi]
pub struct JsCategorizer {
    categorizer: Categorizer,
}

#[napi]
impl JsCategorizer {
    #[napi(constructor)]
    pub fn new(defaults: Option<JsQueryOptions>) -> Result<Self> {
        Ok(Self {
            categorizer: Categorizer::new(Limits::default(), to_options(defaults)?),
        })
    }

    /// Add or replace a category. Throws if the query is invalid.
    #[napi]
    pub fn upsert(&self, name: String, query: String, options: Option<JsQueryOptions>) -> Result<()> {
        let options = match options {
            Some(o) => Some(to_options(Some(o))?),
            None => None,
        };
        self.categorizer
            .upsert(&Category { name, query, options })
            .map_err(|e| Error::new(Status::InvalidArg, e.to_string()))
    }

    #[napi]
    pub fn remove(&self, name: String) -> bool {
        self.categorizer.remove(&name)
    }

    #[napi]
    pub fn names(&self) -> Vec<String> {
        self.categorizer.names()
    }

    /// Categories matching a transcript, in category order.
    #[napi]
    pub fn classify_text(&self, text: String) -> Vec<JsCategoryMatch> {
        self.categorizer
            .classify(&Transcript::from_text(&text))
            .into_iter()
            .map(|m| JsCategoryMatch {
                category: m.category,
                spans: to_js_spans(&m.spans),
            })
            .collect()
    }
}

// ============================================================================
// Standalone Functions
// ============================================================================

/// Compile query text. Throws with the validation result as JSON if invalid.
#[napi]
pub fn compile(query: String, options: Option<JsQueryOptions>) -> Result<JsCompiledQuery> {
    let options = to_options(options)?;
    compile_with_limits(&query, options, &Limits::default())
        .map(|compiled| JsCompiledQuery {
            compiled: Arc::new(compiled),
        })
        .map_err(|result| invalid_query(&result))
}

/// Validate query text without throwing.
#[napi]
pub fn validate(query: String) -> JsValidationResult {
    let (_, result) = validate_query(&query, &Limits::default());
    to_js_result(&result)
}

/// Lex query text, e.g. for syntax highlighting.
#[napi]
pub fn tokenize(query: String) -> Vec<JsToken> {
    lex(&query)
        .into_iter()
        .map(|t| {
            let (kind, distance, ordered) = match t.kind {
                TokenKind::Word => ("WORD", None, None),
                TokenKind::Phrase { .. } => ("PHRASE", None, None),
                TokenKind::And => ("AND", None, None),
                TokenKind::Or => ("OR", None, None),
                TokenKind::Not => ("NOT", None, None),
                TokenKind::Near { distance, ordered } => ("NEAR", Some(distance), Some(ordered)),
                TokenKind::LParen => ("LPAREN", None, None),
                TokenKind::RParen => ("RPAREN", None, None),
                TokenKind::Eof => ("EOF", None, None),
            };
            JsToken {
                kind: kind.to_string(),
                text: t.text,
                position: t.position as u32,
                end: t.end as u32,
                distance,
                ordered,
            }
        })
        .collect()
}

/// Split transcript text into the words the engine matches against.
#[napi]
pub fn split_transcript(text: String) -> Vec<String> {
    tokenize_transcript(&text).into_iter().map(|t| t.text).collect()
}
