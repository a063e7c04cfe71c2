use std::{cell::OnceCell, cmp::Ordering};

use thiserror::Error;

use crate::{
    ast::{BinOp, Expression},
    coerce::CoerceError,
    selector,
    value::Value,
};

/// Errors that can occur while evaluating an expression.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Operator applied to values of incompatible or unsupported types
    #[error("unsupported type comparison: {0}")]
    UnsupportedTypeComparison(String),

    /// A coercion could not convert its input
    #[error("invalid coercion `{name}`: {source}")]
    InvalidCoerce {
        name: String,
        #[source]
        source: CoerceError,
    },

    /// The document is not valid JSON
    #[error("malformed document: {0}")]
    MalformedDocument(#[from] serde_json::Error),
}

/// State for a single evaluation: the raw document and, once a selector
/// needs it, its parsed form.
pub struct EvalContext<'a> {
    source: &'a [u8],
    document: OnceCell<serde_json::Value>,
}

impl<'a> EvalContext<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        EvalContext {
            source,
            document: OnceCell::new(),
        }
    }

    /// The parsed document. Parsed on first call only.
    pub fn document(&self) -> Result<&serde_json::Value, EvalError> {
        if let Some(document) = self.document.get() {
            return Ok(document);
        }
        let parsed: serde_json::Value = serde_json::from_slice(self.source)?;
        Ok(self.document.get_or_init(|| parsed))
    }
}

impl Expression {
    /// Evaluates the expression against a JSON document.
    ///
    /// The document is only parsed if a selector is reached. Evaluation has
    /// no side effects, so calling this repeatedly with the same document
    /// always gives the same result.
    ///
    /// # Examples
    ///
    /// ```
    /// use express_lang::{parse, Value};
    ///
    /// let expression = parse(br#".first_name + " " + .last_name"#).unwrap();
    /// let result = expression.calculate(br#"{"first_name":"Joey","last_name":"Bloggs"}"#);
    /// assert_eq!(result.unwrap(), Value::String("Joey Bloggs".into()));
    /// ```
    pub fn calculate(&self, document: &[u8]) -> Result<Value, EvalError> {
        self.eval(&EvalContext::new(document))
    }

    pub fn eval(&self, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        match self {
            Expression::Float(n) => Ok(Value::Float(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Boolean(b) => Ok(Value::Boolean(*b)),
            Expression::Null => Ok(Value::Null),
            Expression::Selector(path) => Ok(selector::resolve(ctx.document()?, path)),

            Expression::BinaryOp {
                op: BinOp::And,
                left,
                right,
            } => {
                let left = left.eval(ctx)?;
                if left != Value::Boolean(true) {
                    return Ok(Value::Boolean(false));
                }
                match right.eval(ctx)? {
                    Value::Boolean(b) => Ok(Value::Boolean(b)),
                    right => Err(type_error(BinOp::And, &left, &right)),
                }
            }
            Expression::BinaryOp {
                op: BinOp::Or,
                left,
                right,
            } => {
                let left = left.eval(ctx)?;
                match left {
                    Value::Boolean(true) => return Ok(Value::Boolean(true)),
                    Value::Boolean(false) => {}
                    // Reported without touching the right-hand side.
                    _ => {
                        return Err(EvalError::UnsupportedTypeComparison(format!(
                            "{} {}",
                            left.type_name(),
                            BinOp::Or
                        )));
                    }
                }
                match right.eval(ctx)? {
                    Value::Boolean(b) => Ok(Value::Boolean(b)),
                    right => Err(type_error(BinOp::Or, &left, &right)),
                }
            }
            Expression::BinaryOp { op, left, right } => {
                let left = left.eval(ctx)?;
                let right = right.eval(ctx)?;
                apply_binop(*op, left, right)
            }

            Expression::Not(inner) => match inner.eval(ctx)? {
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                other => Err(EvalError::UnsupportedTypeComparison(format!(
                    "NOT {}",
                    other.type_name()
                ))),
            },

            Expression::Between {
                value,
                lower,
                upper,
            } => {
                let value = value.eval(ctx)?;
                let lower = lower.eval(ctx)?;
                let upper = upper.eval(ctx)?;
                between(value, lower, upper)
            }

            Expression::Array(items) => items
                .iter()
                .map(|item| item.eval(ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            Expression::Coerce {
                inner, coercion, ..
            } => {
                let value = inner.eval(ctx)?;
                coercion
                    .0
                    .coerce(value)
                    .map_err(|source| EvalError::InvalidCoerce {
                        name: coercion.name().to_string(),
                        source,
                    })
            }
        }
    }
}

fn type_error(op: BinOp, left: &Value, right: &Value) -> EvalError {
    EvalError::UnsupportedTypeComparison(format!(
        "{} {} {}",
        left.type_name(),
        op,
        right.type_name()
    ))
}

fn apply_binop(op: BinOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => {
            arithmetic(op, left, right)
        }
        BinOp::Equal => Ok(Value::Boolean(left == right)),
        BinOp::NotEqual => Ok(Value::Boolean(left != right)),
        BinOp::GreaterThan | BinOp::GreaterEqual | BinOp::LessThan | BinOp::LessEqual => {
            compare(op, &left, &right)
        }
        BinOp::Contains | BinOp::ContainsAny | BinOp::ContainsAll => {
            contains(op, &left, &right).map(Value::Boolean)
        }
        BinOp::StartsWith => match (&left, &right) {
            (Value::String(a), Value::String(b)) => Ok(Value::Boolean(a.starts_with(b.as_str()))),
            _ => Err(type_error(op, &left, &right)),
        },
        BinOp::EndsWith => match (&left, &right) {
            (Value::String(a), Value::String(b)) => Ok(Value::Boolean(a.ends_with(b.as_str()))),
            _ => Err(type_error(op, &left, &right)),
        },
        BinOp::In => match &right {
            Value::Array(items) => Ok(Value::Boolean(items.contains(&left))),
            _ => Err(type_error(op, &left, &right)),
        },
        // Short-circuiting operators are evaluated by the caller.
        BinOp::And | BinOp::Or => Err(type_error(op, &left, &right)),
    }
}

fn arithmetic(op: BinOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinOp::Add, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (BinOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        // A missing value added to a number or string leaves it unchanged.
        (BinOp::Add, Value::Null, v @ (Value::Float(_) | Value::String(_)))
        | (BinOp::Add, v @ (Value::Float(_) | Value::String(_)), Value::Null) => Ok(v),
        (BinOp::Subtract, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
        (BinOp::Multiply, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
        (BinOp::Divide, Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
        (op, left, right) => Err(type_error(op, &left, &right)),
    }
}

fn ordering(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(Some(a.cmp(b))),
        (Value::Float(a), Value::Float(b)) => Some(a.partial_cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(Some(a.cmp(b))),
        _ => None,
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    // NaN compares as unordered: every comparison with it is false.
    let ordering = ordering(left, right).ok_or_else(|| type_error(op, left, right))?;
    let result = match (op, ordering) {
        (_, None) => false,
        (BinOp::GreaterThan, Some(o)) => o == Ordering::Greater,
        (BinOp::GreaterEqual, Some(o)) => o != Ordering::Less,
        (BinOp::LessThan, Some(o)) => o == Ordering::Less,
        (BinOp::LessEqual, Some(o)) => o != Ordering::Greater,
        (_, Some(_)) => return Err(type_error(op, left, right)),
    };
    Ok(Value::Boolean(result))
}

/// Strict `lower < value < upper`. Any null operand makes the test false.
fn between(value: Value, lower: Value, upper: Value) -> Result<Value, EvalError> {
    if value.is_null() || lower.is_null() || upper.is_null() {
        return Ok(Value::Boolean(false));
    }
    if !value.same_type(&lower) || !value.same_type(&upper) {
        return Err(between_error(&value, &lower, &upper));
    }

    match (ordering(&lower, &value), ordering(&value, &upper)) {
        (Some(above), Some(below)) => Ok(Value::Boolean(
            above == Some(Ordering::Less) && below == Some(Ordering::Less),
        )),
        _ => Err(between_error(&value, &lower, &upper)),
    }
}

fn between_error(value: &Value, lower: &Value, upper: &Value) -> EvalError {
    EvalError::UnsupportedTypeComparison(format!(
        "{} BETWEEN {} AND {}",
        value.type_name(),
        lower.type_name(),
        upper.type_name()
    ))
}

fn quantify(all: bool, mut probes: impl Iterator<Item = bool>) -> bool {
    if all {
        probes.all(|hit| hit)
    } else {
        probes.any(|hit| hit)
    }
}

/// `CONTAINS`, `CONTAINS_ANY` and `CONTAINS_ALL`.
fn contains(op: BinOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let all = op == BinOp::ContainsAll;

    match (op, left, right) {
        (BinOp::Contains, Value::String(a), Value::String(b)) => Ok(a.contains(b.as_str())),
        (BinOp::Contains, Value::Array(items), v) => Ok(items.contains(v)),

        // Character sets
        (BinOp::ContainsAny | BinOp::ContainsAll, Value::String(a), Value::String(b)) => {
            Ok(quantify(all, b.chars().map(|c| a.contains(c))))
        }
        (BinOp::ContainsAny | BinOp::ContainsAll, Value::Array(items), Value::Array(wanted)) => {
            Ok(quantify(all, wanted.iter().map(|v| items.contains(v))))
        }
        // Each character of the string as a one-character element
        (BinOp::ContainsAny | BinOp::ContainsAll, Value::Array(items), Value::String(s)) => {
            Ok(quantify(
                all,
                s.chars()
                    .map(|c| items.contains(&Value::String(c.to_string()))),
            ))
        }
        // Each string element as a substring
        (BinOp::ContainsAny | BinOp::ContainsAll, Value::String(s), Value::Array(wanted)) => {
            Ok(quantify(
                all,
                wanted
                    .iter()
                    .map(|v| v.as_str().is_some_and(|w| s.contains(w))),
            ))
        }

        _ => Err(type_error(op, left, right)),
    }
}
