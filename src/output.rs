//! JSON rendering of evaluation results.
//!
//! - **Compact output** via [`to_json()`]
//! - **Pretty output** via [`to_json_pretty()`] - 2-space indentation
//! - Whole numbers print without a fraction, instants as RFC 3339 strings,
//!   NaN and infinities as `null`
//!
//! # Examples
//!
//! ```
//! use express_lang::Value;
//! use express_lang::output::to_json;
//!
//! assert_eq!(to_json(&Value::Float(42.0)), "42");
//! assert_eq!(to_json(&Value::Array(vec![Value::Boolean(true), Value::Null])), "[true,null]");
//! ```

use crate::value::Value;

/// Converts a Value to compact JSON string representation.
pub fn to_json(value: &Value) -> String {
    serde_json::Value::from(value.clone()).to_string()
}

/// Converts a Value to pretty-printed JSON string representation.
pub fn to_json_pretty(value: &Value) -> String {
    let json = serde_json::Value::from(value.clone());
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}
