//! `evaluate` command implementation.

use crate::cli::args::EvaluateArgs;
use crate::cli::output::Output;
use crate::config::Config;
use crate::error::{CatQueryError, ExitCode, Result};
use crate::query::compile::compile_with_limits;
use crate::transcript::Transcript;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub query: String,
    pub matched: bool,
    pub terms: Vec<String>,
    pub spans: Vec<HighlightedSpan>,
    pub word_count: usize,
}

/// A match span with the transcript words it covers.
#[derive(Debug, Serialize)]
pub struct HighlightedSpan {
    pub start: usize,
    pub end: usize,
    pub term: String,
    pub text: String,
}

pub fn run(config: &Config, args: &EvaluateArgs, output: &Output) -> Result<ExitCode> {
    let options = args.options.resolve(config.defaults);
    let compiled = compile_with_limits(&args.query, options, &config.limits).map_err(|result| {
        CatQueryError::InvalidQuery {
            query: args.query.clone(),
            result,
        }
    })?;

    for warning in &compiled.warnings {
        output.warn(&warning.message);
    }

    let transcript = match (&args.transcript, &args.text) {
        (Some(path), _) => Transcript::load(path)?,
        (None, Some(text)) => Transcript::from_text(text),
        (None, None) => {
            return Err(CatQueryError::Other(
                "either --transcript or --text is required".to_string(),
            ));
        }
    };

    let result = compiled.evaluate(&transcript.tokens);
    let words: Vec<&str> = transcript.words().collect();

    let response = EvaluateResponse {
        query: args.query.clone(),
        matched: result.matched,
        terms: result.terms().into_iter().map(String::from).collect(),
        spans: result
            .spans
            .iter()
            .map(|span| HighlightedSpan {
                start: span.start,
                end: span.end,
                term: span.term.clone(),
                text: words[span.start..span.end].join(" "),
            })
            .collect(),
        word_count: transcript.len(),
    };
    output.print(&response)?;
    Ok(ExitCode::Success)
}
