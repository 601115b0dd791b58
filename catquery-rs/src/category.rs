//! Categories and batch classification of transcripts.
//!
//! A [`Categorizer`] holds an immutable snapshot of compiled categories.
//! Edits build a new snapshot and swap it in, so classification running on
//! other threads always sees a complete set.

use crate::error::{CatQueryError, Result};
use crate::query::compile::{CompiledQuery, compile_with_limits};
use crate::query::diagnostic::ValidationResult;
use crate::query::types::{Limits, MatchSpan, QueryOptions};
use crate::transcript::Transcript;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// A named query, as stored by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub query: String,
    /// Falls back to the categorizer's defaults when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<QueryOptions>,
}

/// On-disk list of categories (YAML, TOML or JSON).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFile {
    pub categories: Vec<Category>,
}

impl CategoryFile {
    /// Load a category file, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CatQueryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let invalid = |message: String| CatQueryError::InvalidCategoryFile {
            path: path.to_path_buf(),
            message,
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let file: CategoryFile = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            "toml" => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            "json" => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            other => {
                return Err(invalid(format!(
                    "unsupported extension '{}' (expected yaml, yml, toml or json)",
                    other
                )));
            }
        };

        let mut seen = HashSet::new();
        for category in &file.categories {
            if category.name.trim().is_empty() {
                return Err(invalid("category with an empty name".to_string()));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(CatQueryError::DuplicateCategory(category.name.clone()));
            }
        }

        Ok(file)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledCategory {
    pub name: String,
    pub query: Arc<CompiledQuery>,
}

/// A category whose query failed validation.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedCategory {
    pub name: String,
    pub query: String,
    pub result: ValidationResult,
}

/// A category that matched a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMatch {
    pub category: String,
    pub spans: Vec<MatchSpan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptReport {
    pub id: String,
    pub word_count: usize,
    pub categories: Vec<CategoryMatch>,
}

/// Outcome of classifying a batch of transcripts.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub generated_at: DateTime<Utc>,
    pub category_count: usize,
    pub transcript_count: usize,
    /// One entry per input transcript, in input order.
    pub results: Vec<TranscriptReport>,
}

impl ClassificationReport {
    /// Number of transcripts that matched at least one category.
    pub fn matched_count(&self) -> usize {
        self.results.iter().filter(|r| !r.categories.is_empty()).count()
    }
}

pub struct Categorizer {
    limits: Limits,
    defaults: QueryOptions,
    snapshot: RwLock<Arc<Vec<CompiledCategory>>>,
}

impl Categorizer {
    pub fn new(limits: Limits, defaults: QueryOptions) -> Self {
        Self {
            limits,
            defaults,
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Compile a set of categories, returning the ones that were rejected.
    ///
    /// Later categories with a name already seen replace earlier ones.
    pub fn from_categories(
        categories: &[Category],
        limits: Limits,
        defaults: QueryOptions,
    ) -> (Self, Vec<RejectedCategory>) {
        let categorizer = Self::new(limits, defaults);
        let mut compiled: Vec<CompiledCategory> = Vec::with_capacity(categories.len());
        let mut rejected = Vec::new();

        for category in categories {
            match categorizer.compile_category(category) {
                Ok(c) => {
                    compiled.retain(|existing| existing.name != c.name);
                    compiled.push(c);
                }
                Err(result) => {
                    tracing::warn!(
                        category = %category.name,
                        errors = %result,
                        "skipping category with invalid query"
                    );
                    rejected.push(RejectedCategory {
                        name: category.name.clone(),
                        query: category.query.clone(),
                        result,
                    });
                }
            }
        }

        categorizer.swap(compiled);
        (categorizer, rejected)
    }

    fn compile_category(&self, category: &Category) -> std::result::Result<CompiledCategory, ValidationResult> {
        let options = category.options.unwrap_or(self.defaults);
        let query = compile_with_limits(&category.query, options, &self.limits)?;
        Ok(CompiledCategory {
            name: category.name.clone(),
            query: Arc::new(query),
        })
    }

    /// The current set of compiled categories.
    pub fn snapshot(&self) -> Arc<Vec<CompiledCategory>> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn swap(&self, next: Vec<CompiledCategory>) {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
    }

    /// Add or replace a category. An invalid query leaves the set unchanged.
    pub fn upsert(&self, category: &Category) -> Result<()> {
        let compiled = self
            .compile_category(category)
            .map_err(|result| CatQueryError::InvalidCategoryQuery {
                category: category.name.clone(),
                result,
            })?;

        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        let mut next: Vec<CompiledCategory> = (**guard).clone();
        match next.iter_mut().find(|c| c.name == compiled.name) {
            Some(existing) => *existing = compiled,
            None => next.push(compiled),
        }
        *guard = Arc::new(next);
        tracing::debug!(category = %category.name, "category updated");
        Ok(())
    }

    /// Remove a category by name. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.iter().any(|c| c.name == name) {
            return false;
        }
        let next: Vec<CompiledCategory> = guard.iter().filter(|c| c.name != name).cloned().collect();
        *guard = Arc::new(next);
        tracing::debug!(category = name, "category removed");
        true
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|c| c.name.clone()).collect()
    }

    /// Categories matching one transcript, in category order.
    pub fn classify(&self, transcript: &Transcript) -> Vec<CategoryMatch> {
        classify_with(&self.snapshot(), transcript)
    }

    /// Classify many transcripts in parallel against one snapshot.
    pub fn classify_batch<S>(&self, transcripts: &[(S, Transcript)]) -> ClassificationReport
    where
        S: AsRef<str> + Sync,
    {
        let snapshot = self.snapshot();

        let results: Vec<TranscriptReport> = transcripts
            .par_iter()
            .map(|(id, transcript)| TranscriptReport {
                id: id.as_ref().to_string(),
                word_count: transcript.len(),
                categories: classify_with(&snapshot, transcript),
            })
            .collect();

        let report = ClassificationReport {
            generated_at: Utc::now(),
            category_count: snapshot.len(),
            transcript_count: results.len(),
            results,
        };
        tracing::info!(
            transcripts = report.transcript_count,
            categories = report.category_count,
            matched = report.matched_count(),
            "batch classified"
        );
        report
    }

    /// Like [`classify_batch`](Self::classify_batch) on a dedicated pool of `threads` workers.
    pub fn classify_batch_on<S>(
        &self,
        transcripts: &[(S, Transcript)],
        threads: Option<usize>,
    ) -> Result<ClassificationReport>
    where
        S: AsRef<str> + Sync,
    {
        let Some(threads) = threads else {
            return Ok(self.classify_batch(transcripts));
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| CatQueryError::Other(format!("cannot start worker pool: {}", e)))?;
        Ok(pool.install(|| self.classify_batch(transcripts)))
    }
}

fn classify_with(categories: &[CompiledCategory], transcript: &Transcript) -> Vec<CategoryMatch> {
    categories
        .iter()
        .filter_map(|category| {
            let result = category.query.evaluate(&transcript.tokens);
            result.matched.then(|| CategoryMatch {
                category: category.name.clone(),
                spans: result.spans,
            })
        })
        .collect()
}
