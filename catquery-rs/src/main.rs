//! catquery CLI entry point.

use catquery::cli::args::{Cli, Commands};
use catquery::cli::output::Output;
use catquery::cli::{classify, evaluate, syntax};
use catquery::config::Config;
use catquery::error::{CatQueryError, ExitCode as CatQueryExitCode};
use clap::Parser;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

fn run(cli: &Cli) -> Result<CatQueryExitCode, CatQueryError> {
    let config = Config::load(cli.config.as_deref())?;
    let output = Output::new(cli.output_format(), cli.quiet);

    match &cli.command {
        Commands::Tokenize(args) => syntax::tokenize(args, &output),
        Commands::Parse(args) => syntax::parse(args, &output),
        Commands::Validate(args) => syntax::validate(&config, args, &output),
        Commands::Evaluate(args) => evaluate::run(&config, args, &output),
        Commands::Classify(args) => classify::run(&config, args, &output),
    }
}
