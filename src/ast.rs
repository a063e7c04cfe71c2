//! # Express - Abstract Syntax Tree
//!
//! Types shared by the tokenizer, the parser and the evaluator.
//!
//! - **[tokens]** - Tokens produced by the tokenizer
//! - **[expressions]** - The compiled expression tree
//! - **[operators]** - Binary operators
//!
//! ## Quick Start
//!
//! ```text
//! .properties.employees > 20 && .name STARTSWITH "My"
//! ```
//!
//! ## Grouping
//!
//! Operators have no precedence. `1 + 2 * 3` is `(1 + 2) * 3`; use
//! parentheses for any other grouping. Logical `&&` and `||` are the
//! exception: their right operand is the rest of the enclosing group, so
//! comparisons joined by them read naturally.
//!
//! ## Coercions
//!
//! ```text
//! COERCE .created_at _datetime_ > COERCE "2022-01-01" _datetime_
//! ```
//!
//! `COERCE` wraps a value with a named transformation looked up in the
//! coercion registry at parse time.
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expression;
pub use operators::BinOp;
pub use tokens::{Token, TokenKind};
