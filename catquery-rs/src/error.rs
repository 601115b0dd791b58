//! Error types and exit codes for catquery.

use crate::query::diagnostic::ValidationResult;
use std::path::PathBuf;
use thiserror::Error;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_QUERY: i32 = 2;
    pub const INVALID_CATEGORY_FILE: i32 = 3;
    pub const CONFIG_ERROR: i32 = 4;
}

/// Main error type for catquery operations.
///
/// Query compilation itself reports problems through [`ValidationResult`];
/// this type wraps that for callers (categories, CLI) that need a single
/// error channel.
#[derive(Error, Debug)]
pub enum CatQueryError {
    #[error("Invalid query '{query}': {result}")]
    InvalidQuery {
        query: String,
        result: ValidationResult,
    },

    #[error("Invalid query for category '{category}': {result}")]
    InvalidCategoryQuery {
        category: String,
        result: ValidationResult,
    },

    #[error("Invalid category file {path}: {message}")]
    InvalidCategoryFile { path: PathBuf, message: String },

    #[error("Duplicate category name: {0}")]
    DuplicateCategory(String),

    #[error("Invalid transcript {path}: {message}")]
    InvalidTranscript { path: PathBuf, message: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML serialize error: {0}")]
    YamlSerialize(#[from] serde_yaml::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("{0}")]
    Other(String),
}

impl CatQueryError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CatQueryError::InvalidQuery { .. } => exit_code::INVALID_QUERY,
            CatQueryError::InvalidCategoryQuery { .. }
            | CatQueryError::InvalidCategoryFile { .. }
            | CatQueryError::DuplicateCategory(_) => exit_code::INVALID_CATEGORY_FILE,
            CatQueryError::ConfigError(_) => exit_code::CONFIG_ERROR,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

/// Result type alias for catquery operations.
pub type Result<T> = std::result::Result<T, CatQueryError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    InvalidQuery,
    InvalidCategoryFile,
    ConfigError,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::InvalidQuery => exit_code::INVALID_QUERY,
            ExitCode::InvalidCategoryFile => exit_code::INVALID_CATEGORY_FILE,
            ExitCode::ConfigError => exit_code::CONFIG_ERROR,
        }
    }
}
