//! Evaluate expressions against JSON input

use std::io::{BufRead, Write};

use super::CliError;
use crate::{Expression, Value, output, parse};

/// Options for a single evaluation
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON document
    pub data: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Expression evaluated successfully
    Success(Value),
}

/// Compiles the expression and, unless only checking syntax, evaluates it
/// against `options.data`.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let expression = parse(options.expression.as_bytes())?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let data = options.data.as_ref().ok_or(CliError::NoInput)?;
    Ok(CheckResult::Success(expression.calculate(data.as_bytes())?))
}

/// Evaluates `expression` against every non-empty line of `input` and
/// writes one JSON result per line. Stops at the first failing line.
///
/// Returns the number of lines evaluated.
pub fn execute_lines<R, W>(
    expression: &Expression,
    input: R,
    output: &mut W,
    pretty: bool,
) -> Result<usize, CliError>
where
    R: BufRead,
    W: Write,
{
    let mut count = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let value = expression.calculate(line.as_bytes())?;
        let json = if pretty {
            output::to_json_pretty(&value)
        } else {
            output::to_json(&value)
        };
        writeln!(output, "{}", json)?;
        count += 1;
    }
    Ok(count)
}
