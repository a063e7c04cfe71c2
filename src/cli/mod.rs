//! CLI support for express-lang
//!
//! The binary is a thin wrapper over these functions, so they can also be
//! embedded in other tools.

mod check;

pub use check::{CheckOptions, CheckResult, execute_check, execute_lines};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
///
/// Invalid JSON input surfaces as [`CliError::Eval`] wrapping
/// [`crate::EvalError::MalformedDocument`].
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Pass DATA or pipe JSON lines to stdin.")]
    NoInput,
}
