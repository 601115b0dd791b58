//! `tokenize`, `parse` and `validate` commands.

use crate::cli::args::{ParseArgs, TokenizeArgs, ValidateArgs};
use crate::cli::output::Output;
use crate::config::Config;
use crate::error::{ExitCode, Result};
use crate::query::compile::compile_with_limits;
use crate::query::diagnostic::{ValidationError, ValidationWarning};
use crate::query::lexer::{Token, normalize_whitespace, tokenize as lex};
use crate::query::optimizer::optimize;
use crate::query::parser::parse_query;
use crate::query::types::Node;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TokenizeResponse {
    pub query: String,
    pub normalized: String,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationError>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub query: String,
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    /// The optimized tree, for valid queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiled: Option<String>,
}

pub fn tokenize(args: &TokenizeArgs, output: &Output) -> Result<ExitCode> {
    let response = TokenizeResponse {
        query: args.query.clone(),
        normalized: normalize_whitespace(&args.query),
        tokens: lex(&args.query),
    };
    output.print(&response)?;
    Ok(ExitCode::Success)
}

pub fn parse(args: &ParseArgs, output: &Output) -> Result<ExitCode> {
    let (response, code) = match parse_query(&args.query) {
        Ok(tree) => {
            let tree = if args.optimize { optimize(tree) } else { tree };
            let response = ParseResponse {
                query: args.query.clone(),
                rendered: Some(tree.to_string()),
                tree: Some(tree),
                error: None,
            };
            (response, ExitCode::Success)
        }
        Err(e) => {
            let response = ParseResponse {
                query: args.query.clone(),
                rendered: None,
                tree: None,
                error: Some(e.to_validation_error(&args.query)),
            };
            (response, ExitCode::InvalidQuery)
        }
    };
    output.print(&response)?;
    Ok(code)
}

pub fn validate(config: &Config, args: &ValidateArgs, output: &Output) -> Result<ExitCode> {
    let options = args.options.resolve(config.defaults);

    let (response, code) = match compile_with_limits(&args.query, options, &config.limits) {
        Ok(compiled) => {
            let response = ValidateResponse {
                query: args.query.clone(),
                is_valid: true,
                errors: Vec::new(),
                warnings: compiled.warnings.clone(),
                compiled: Some(compiled.ast.to_string()),
            };
            (response, ExitCode::Success)
        }
        Err(result) => {
            let response = ValidateResponse {
                query: args.query.clone(),
                is_valid: false,
                errors: result.errors,
                warnings: result.warnings,
                compiled: None,
            };
            (response, ExitCode::InvalidQuery)
        }
    };
    output.print(&response)?;
    Ok(code)
}
