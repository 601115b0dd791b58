//! Python bindings for catquery.
//!
//! Intended for batch categorization jobs: compile category queries once,
//! then classify many transcripts.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use ::catquery::category::{Categorizer, Category, CategoryFile};
use ::catquery::config::Config;
use ::catquery::query::{
    CompiledQuery, Language, Limits, MatchResult, QueryOptions, ValidationError, ValidationResult,
    compile_with_limits, validate_query,
};
use ::catquery::transcript::Transcript;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Types for Python
// ============================================================================

/// A validation problem with its location in the query text.
#[pyclass]
#[derive(Debug, Clone)]
pub struct Diagnostic {
    #[pyo3(get)]
    pub code: String,
    #[pyo3(get)]
    pub message: String,
    #[pyo3(get)]
    pub start: usize,
    #[pyo3(get)]
    pub end: usize,
    #[pyo3(get)]
    pub line: usize,
    #[pyo3(get)]
    pub column: usize,
}

#[pymethods]
impl Diagnostic {
    fn __repr__(&self) -> String {
        format!("Diagnostic(code='{}', start={}, end={})", self.code, self.start, self.end)
    }
}

impl From<&ValidationError> for Diagnostic {
    fn from(e: &ValidationError) -> Self {
        Self {
            code: e.code.to_string(),
            message: e.message.clone(),
            start: e.position.start,
            end: e.position.end,
            line: e.position.line,
            column: e.position.column,
        }
    }
}

/// Where a query term matched, as a half-open range of word indices.
#[pyclass]
#[derive(Debug, Clone)]
pub struct Span {
    #[pyo3(get)]
    pub start: usize,
    #[pyo3(get)]
    pub end: usize,
    #[pyo3(get)]
    pub term: String,
}

#[pymethods]
impl Span {
    fn __repr__(&self) -> String {
        format!("Span(start={}, end={}, term='{}')", self.start, self.end, self.term)
    }
}

/// Result of evaluating a query against one transcript.
#[pyclass]
#[derive(Debug, Clone)]
pub struct Match {
    #[pyo3(get)]
    pub matched: bool,
    #[pyo3(get)]
    pub terms: Vec<String>,
    #[pyo3(get)]
    pub spans: Vec<Span>,
}

#[pymethods]
impl Match {
    fn __repr__(&self) -> String {
        format!("Match(matched={}, terms={:?})", self.matched, self.terms)
    }

    fn __bool__(&self) -> bool {
        self.matched
    }
}

impl From<&MatchResult> for Match {
    fn from(result: &MatchResult) -> Self {
        Self {
            matched: result.matched,
            terms: result.terms().into_iter().map(String::from).collect(),
            spans: result
                .spans
                .iter()
                .map(|s| Span {
                    start: s.start,
                    end: s.end,
                    term: s.term.clone(),
                })
                .collect(),
        }
    }
}

fn options_from(
    enable_stemming: bool,
    language: Option<&str>,
    case_sensitive: bool,
) -> PyResult<QueryOptions> {
    let language = match language {
        Some(l) => l.parse::<Language>().map_err(PyValueError::new_err)?,
        None => Default::default(),
    };
    Ok(QueryOptions {
        enable_stemming,
        language,
        case_sensitive,
    })
}

fn invalid_query(result: &ValidationResult) -> PyErr {
    PyValueError::new_err(result.to_string())
}

// ============================================================================
// CompiledQuery Class
// ============================================================================

/// A validated query ready for evaluation.
///
/// Example:
///     >>> q = catquery_py.compile("refund OR return")
///     >>> q.evaluate_text("I want a return").terms
///     ['return']
#[pyclass(name = "CompiledQuery", frozen)]
pub struct PyCompiledQuery {
    compiled: Arc<CompiledQuery>,
}

#[pymethods]
impl PyCompiledQuery {
    #[getter]
    pub fn raw_text(&self) -> String {
        self.compiled.raw_text.clone()
    }

    /// The optimized tree rendered back to query syntax.
    #[getter]
    pub fn tree(&self) -> String {
        self.compiled.ast.to_string()
    }

    #[getter]
    pub fn warnings(&self) -> Vec<String> {
        self.compiled.warnings.iter().map(|w| w.message.clone()).collect()
    }

    /// The tree as a JSON string.
    pub fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(self.compiled.ast.as_ref())
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Evaluate against a list of words.
    pub fn evaluate(&self, words: Vec<String>) -> Match {
        let transcript = Transcript::from_words(&words);
        Match::from(&self.compiled.evaluate(&transcript.tokens))
    }

    /// Evaluate against raw transcript text.
    pub fn evaluate_text(&self, text: &str) -> Match {
        let transcript = Transcript::from_text(text);
        Match::from(&self.compiled.evaluate(&transcript.tokens))
    }

    fn __repr__(&self) -> String {
        format!("CompiledQuery('{}')", self.compiled.raw_text)
    }
}

// ============================================================================
// Categorizer Class
// ============================================================================

/// A set of compiled categories for classifying transcripts.
#[pyclass(name = "Categorizer", frozen)]
pub struct PyCategorizer {
    categorizer: Categorizer,
    threads: Option<usize>,
}

#[pymethods]
impl PyCategorizer {
    /// Create an empty categorizer.
    #[new]
    #[pyo3(signature = (enable_stemming=false, language=None, case_sensitive=false))]
    pub fn new(enable_stemming: bool, language: Option<&str>, case_sensitive: bool) -> PyResult<Self> {
        let defaults = options_from(enable_stemming, language, case_sensitive)?;
        Ok(Self {
            categorizer: Categorizer::new(Limits::default(), defaults),
            threads: None,
        })
    }

    /// Load categories from a YAML, TOML or JSON file.
    ///
    /// Uses the catquery config (limits, defaults, batch threads) if one is
    /// found. Returns the categorizer and the names of rejected categories.
    #[staticmethod]
    pub fn from_file(path: String) -> PyResult<(Self, Vec<String>)> {
        let config = Config::load(None).map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        let file = CategoryFile::load(&PathBuf::from(path))
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let (categorizer, rejected) =
            Categorizer::from_categories(&file.categories, config.limits, config.defaults);
        let rejected = rejected.into_iter().map(|r| r.name).collect();
        Ok((
            Self {
                categorizer,
                threads: config.batch.threads,
            },
            rejected,
        ))
    }

    /// Add or replace a category. Raises ValueError if the query is invalid.
    #[pyo3(signature = (name, query, enable_stemming=None, language=None, case_sensitive=None))]
    pub fn upsert(
        &self,
        name: String,
        query: String,
        enable_stemming: Option<bool>,
        language: Option<&str>,
        case_sensitive: Option<bool>,
    ) -> PyResult<()> {
        let options = if enable_stemming.is_some() || language.is_some() || case_sensitive.is_some() {
            Some(options_from(
                enable_stemming.unwrap_or(false),
                language,
                case_sensitive.unwrap_or(false),
            )?)
        } else {
            None
        };
        self.categorizer
            .upsert(&Category { name, query, options })
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    pub fn remove(&self, name: &str) -> bool {
        self.categorizer.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.categorizer.names()
    }

    /// Names of the categories matching a transcript.
    pub fn classify(&self, text: &str) -> Vec<String> {
        self.categorizer
            .classify(&Transcript::from_text(text))
            .into_iter()
            .map(|m| m.category)
            .collect()
    }

    /// Classify many `(id, text)` pairs in parallel, without holding the GIL.
    ///
    /// Returns `(id, [category, ...])` pairs in input order.
    pub fn classify_batch(
        &self,
        py: Python<'_>,
        items: Vec<(String, String)>,
    ) -> PyResult<Vec<(String, Vec<String>)>> {
        let transcripts: Vec<(String, Transcript)> = items
            .into_iter()
            .map(|(id, text)| (id, Transcript::from_text(&text)))
            .collect();

        let report = py
            .detach(|| self.categorizer.classify_batch_on(&transcripts, self.threads))
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;

        Ok(report
            .results
            .into_iter()
            .map(|r| (r.id, r.categories.into_iter().map(|c| c.category).collect()))
            .collect())
    }

    fn __len__(&self) -> usize {
        self.categorizer.len()
    }
}

// ============================================================================
// Standalone Functions
// ============================================================================

/// Compile query text.
///
/// Raises:
///     ValueError: With every validation error if the query is invalid.
#[pyfunction]
#[pyo3(signature = (query, enable_stemming=false, language=None, case_sensitive=false))]
pub fn compile(
    query: &str,
    enable_stemming: bool,
    language: Option<&str>,
    case_sensitive: bool,
) -> PyResult<PyCompiledQuery> {
    let options = options_from(enable_stemming, language, case_sensitive)?;
    compile_with_limits(query, options, &Limits::default())
        .map(|compiled| PyCompiledQuery {
            compiled: Arc::new(compiled),
        })
        .map_err(|result| invalid_query(&result))
}

/// Validate query text and return every error found (empty if valid).
#[pyfunction]
pub fn validate(query: &str) -> Vec<Diagnostic> {
    let (_, result) = validate_query(query, &Limits::default());
    result.errors.iter().map(Diagnostic::from).collect()
}

/// Split transcript text into the words the engine matches against.
#[pyfunction]
pub fn split_transcript(text: &str) -> Vec<String> {
    Transcript::from_text(text).words().map(String::from).collect()
}

#[pymodule]
fn catquery_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCompiledQuery>()?;
    m.add_class::<PyCategorizer>()?;
    m.add_class::<Diagnostic>()?;
    m.add_class::<Span>()?;
    m.add_class::<Match>()?;
    m.add_function(wrap_pyfunction!(compile, m)?)?;
    m.add_function(wrap_pyfunction!(validate, m)?)?;
    m.add_function(wrap_pyfunction!(split_transcript, m)?)?;
    Ok(())
}
