//! CLI argument definitions using clap.

use crate::query::types::{Language, QueryOptions};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catquery")]
#[command(author, version, about = "Compile category queries and classify call transcripts", long_about = None)]
pub struct Cli {
    /// Path to a config file (overrides $CATQUERY_CONFIG and the default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the lexer's tokens for a query
    Tokenize(TokenizeArgs),

    /// Parse a query and print its syntax tree
    Parse(ParseArgs),

    /// Validate a query and report every problem found
    Validate(ValidateArgs),

    /// Evaluate a query against one transcript
    Evaluate(EvaluateArgs),

    /// Classify transcripts against a category file
    Classify(ClassifyArgs),
}

/// Matching options shared by commands that compile queries.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryOptionArgs {
    /// Compare word stems ("refund" matches "refunding")
    #[arg(long)]
    pub stemming: bool,

    /// Match case exactly
    #[arg(long)]
    pub case_sensitive: bool,

    /// Query language (english, spanish, french, german, portuguese)
    #[arg(long)]
    pub language: Option<Language>,
}

impl QueryOptionArgs {
    /// Flags given on the command line win over configured defaults.
    pub fn resolve(&self, defaults: QueryOptions) -> QueryOptions {
        QueryOptions {
            enable_stemming: self.stemming || defaults.enable_stemming,
            case_sensitive: self.case_sensitive || defaults.case_sensitive,
            language: self.language.unwrap_or(defaults.language),
        }
    }
}

// === Tokenize ===

#[derive(Parser, Debug)]
pub struct TokenizeArgs {
    /// Query text
    pub query: String,
}

// === Parse ===

#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Query text
    pub query: String,

    /// Simplify the tree before printing
    #[arg(long)]
    pub optimize: bool,
}

// === Validate ===

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Query text
    pub query: String,

    #[command(flatten)]
    pub options: QueryOptionArgs,
}

// === Evaluate ===

#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// Query text
    pub query: String,

    /// Transcript file (.txt, or .json with words or text)
    #[arg(long, conflicts_with = "text", required_unless_present = "text")]
    pub transcript: Option<PathBuf>,

    /// Transcript text given inline
    #[arg(long)]
    pub text: Option<String>,

    #[command(flatten)]
    pub options: QueryOptionArgs,
}

// === Classify ===

#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// Category file (.yaml, .toml or .json)
    #[arg(long)]
    pub categories: PathBuf,

    /// Transcript files or glob patterns
    #[arg(required = true)]
    pub transcripts: Vec<String>,

    /// Only list transcripts that matched at least one category
    #[arg(long)]
    pub matched_only: bool,

    #[command(flatten)]
    pub options: QueryOptionArgs,
}
