//! CLI command implementations.

pub mod args;
pub mod output;

pub mod classify;
pub mod evaluate;
pub mod syntax;

pub use args::{Cli, Commands};
pub use output::Output;
