//! `classify` command implementation.

use crate::category::{Categorizer, CategoryFile, ClassificationReport, RejectedCategory};
use crate::cli::args::ClassifyArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::error::{CatQueryError, ExitCode, Result};
use crate::transcript::Transcript;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub categories_file: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedCategory>,
    pub report: ClassificationReport,
}

pub fn run(config: &Config, args: &ClassifyArgs, output: &Output) -> Result<ExitCode> {
    let file = CategoryFile::load(&args.categories)?;
    let defaults = args.options.resolve(config.defaults);
    let (categorizer, rejected) = Categorizer::from_categories(&file.categories, config.limits, defaults);

    for r in &rejected {
        output.warn(&format!("category '{}' skipped: {}", r.name, r.result));
    }

    let paths = expand_transcripts(&args.transcripts, output)?;
    if paths.is_empty() {
        return Err(CatQueryError::Other(
            "no transcripts matched the given paths".to_string(),
        ));
    }

    let transcripts = paths
        .iter()
        .map(|path| -> Result<(String, Transcript)> {
            Ok((path.display().to_string(), Transcript::load(path)?))
        })
        .collect::<Result<Vec<(String, Transcript)>>>()?;

    let mut report = categorizer.classify_batch_on(&transcripts, config.batch.threads)?;
    if args.matched_only {
        report.results.retain(|r| !r.categories.is_empty());
    }

    output.info(&format!(
        "{} of {} transcripts matched {} categories",
        report.matched_count(),
        report.transcript_count,
        report.category_count
    ));

    let code = if rejected.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::InvalidCategoryFile
    };

    output.print(&ClassifyResponse {
        categories_file: args.categories.display().to_string(),
        rejected,
        report,
    })?;
    Ok(code)
}

/// Expand glob patterns into a sorted, deduplicated list of files.
fn expand_transcripts(patterns: &[String], output: &Output) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let before = paths.len();
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => output.warn(&format!("cannot read {}: {}", e.path().display(), e.error())),
            }
        }
        if paths.len() == before {
            output.warn(&format!("no transcripts match '{}'", pattern));
        }
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}
