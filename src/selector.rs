//! Field selector resolution.
//!
//! A selector such as `.properties.employees` is stored as its path
//! segments. At evaluation time the segments are walked through the parsed
//! document:
//!
//! - on an object, a segment is a key (`.user.name`)
//! - on an array, a segment that is an unsigned integer is an index
//!   (`.items.0.price`)
//!
//! Lookup is lenient: a missing key, an out-of-range index or a step
//! through a scalar resolves to [`Value::Null`] instead of an error.

use serde_json::Value as JsonValue;

use crate::value::Value;

/// Walks `path` through `document`.
///
/// # Examples
///
/// ```
/// use express_lang::{selector::resolve, Value};
/// use serde_json::json;
///
/// let doc = json!({"items": [{"price": 5}]});
/// let path = ["items".to_string(), "0".to_string(), "price".to_string()];
/// assert_eq!(resolve(&doc, &path), Value::Float(5.0));
/// assert_eq!(resolve(&doc, &["missing".to_string()]), Value::Null);
/// ```
pub fn resolve(document: &JsonValue, path: &[String]) -> Value {
    lookup(document, path).map_or(Value::Null, Value::from)
}

fn lookup<'a>(document: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter().try_fold(document, |current, segment| match current {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
