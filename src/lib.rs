//! # Express
//!
//! Filter expressions compiled once and evaluated against JSON documents.
//!
//! ```
//! use express_lang::{parse, Value};
//!
//! let expression = parse(b"COERCE .dt1 _datetime_ == COERCE .dt2 _datetime_").unwrap();
//! let result = expression.calculate(br#"{"dt1":"2022-01-02","dt2":"2022-01-02T00:00:00Z"}"#);
//! assert_eq!(result.unwrap(), Value::Boolean(true));
//! ```
pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod coerce;
pub mod evaluator;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod selector;
pub mod value;

pub use ast::{BinOp, Expression, Token, TokenKind};
pub use coerce::{Coercion, register_coercion, register_value_coercion};
pub use evaluator::{EvalContext, EvalError};
pub use lexer::{LexError, Tokenizer};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, parse};
pub use value::Value;
