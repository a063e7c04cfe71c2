use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use super::{CoerceError, Coercion, Installer, installer, wrap_with};
use crate::{
    ast::{Expression, TokenKind},
    parser::{ParseError, Parser},
    value::Value,
};

/// Seeds the registry.
pub(super) fn installers() -> HashMap<String, Arc<Installer>> {
    let coercions: [Arc<dyn Coercion>; 6] = [
        Arc::new(DateTimeCoercion),
        Arc::new(CaseCoercion::Lower),
        Arc::new(CaseCoercion::Upper),
        Arc::new(CaseCoercion::Title),
        Arc::new(StringCoercion),
        Arc::new(NumberCoercion),
    ];

    let mut map: HashMap<String, Arc<Installer>> = coercions
        .into_iter()
        .map(|c| (c.name().to_string(), wrap_with(c)))
        .collect();
    map.insert("_substr_".to_string(), installer(install_substring));
    map
}

/// `_datetime_`: parses ISO-8601 style strings into UTC instants.
///
/// Accepted forms, tried in order:
/// - RFC 3339 with offset (`2022-01-02T03:04:05+01:00`, `...Z`)
/// - naive date-time with `T` or space separator, optional fraction (UTC)
/// - date only (`2022-01-02`, midnight UTC)
pub struct DateTimeCoercion;

impl DateTimeCoercion {
    pub fn parse(s: &str) -> Result<DateTime<Utc>, CoerceError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(naive.and_utc());
            }
        }

        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("`{}` is not a date or datetime: {}", s, e))?;
        date.and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("`{}` has no midnight", s).into())
    }
}

impl Coercion for DateTimeCoercion {
    fn name(&self) -> &str {
        "_datetime_"
    }

    fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
        match value {
            Value::String(s) => Self::parse(&s).map(Value::DateTime),
            v @ (Value::Null | Value::DateTime(_)) => Ok(v),
            other => Err(format!("cannot coerce {} to datetime", other.type_name()).into()),
        }
    }
}

/// `_lowercase_`, `_uppercase_` and `_title_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseCoercion {
    Lower,
    Upper,
    /// First letter of every whitespace-separated word upper, rest lower.
    Title,
}

impl Coercion for CaseCoercion {
    fn name(&self) -> &str {
        match self {
            CaseCoercion::Lower => "_lowercase_",
            CaseCoercion::Upper => "_uppercase_",
            CaseCoercion::Title => "_title_",
        }
    }

    fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
        let s = match value {
            Value::String(s) => s,
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(format!("{} expects a string, got {}", self.name(), other.type_name()).into());
            }
        };

        let converted = match self {
            CaseCoercion::Lower => s.to_lowercase(),
            CaseCoercion::Upper => s.to_uppercase(),
            CaseCoercion::Title => {
                let mut out = String::with_capacity(s.len());
                let mut word_start = true;
                for c in s.chars() {
                    if c.is_whitespace() {
                        word_start = true;
                        out.push(c);
                    } else if word_start {
                        word_start = false;
                        out.extend(c.to_uppercase());
                    } else {
                        out.extend(c.to_lowercase());
                    }
                }
                out
            }
        };
        Ok(Value::String(converted))
    }
}

/// `_string_`: renders any value as a string.
pub struct StringCoercion;

impl StringCoercion {
    pub fn render(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Boolean(b) => b.to_string(),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            Value::Float(f) => f.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Value::Null => "null".to_string(),
            other @ (Value::Array(_) | Value::Object(_)) => serde_json::Value::from(other).to_string(),
        }
    }
}

impl Coercion for StringCoercion {
    fn name(&self) -> &str {
        "_string_"
    }

    fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
        match value {
            Value::Null => Ok(Value::Null),
            other => Ok(Value::String(Self::render(other))),
        }
    }
}

/// `_number_`: strings, booleans and instants to numbers.
///
/// Instants become fractional Unix seconds.
pub struct NumberCoercion;

impl Coercion for NumberCoercion {
    fn name(&self) -> &str {
        "_number_"
    }

    fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
        match value {
            Value::String(s) => {
                let n = s
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("`{}` is not a number: {}", s, e))?;
                Ok(Value::Float(n))
            }
            Value::Boolean(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
            Value::DateTime(dt) => Ok(Value::Float(
                dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9,
            )),
            v @ (Value::Float(_) | Value::Null) => Ok(v),
            other => Err(format!("cannot coerce {} to number", other.type_name()).into()),
        }
    }
}

/// `_substr_[start:end]`: character-indexed substring, either bound optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substring {
    start: Option<usize>,
    end: Option<usize>,
    name: String,
}

impl Substring {
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        let bound = |b: Option<usize>| b.map(|n| n.to_string()).unwrap_or_default();
        Substring {
            start,
            end,
            name: format!("_substr_[{}:{}]", bound(start), bound(end)),
        }
    }
}

impl Coercion for Substring {
    fn name(&self) -> &str {
        &self.name
    }

    fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
        let s = match value {
            Value::String(s) => s,
            Value::Null => return Ok(Value::Null),
            other => return Err(format!("cannot take a substring of {}", other.type_name()).into()),
        };

        let len = s.chars().count();
        let start = self.start.unwrap_or(0);
        let end = self.end.unwrap_or(len);
        if start > end || end > len {
            return Err(format!("range [{}:{}] is out of bounds for length {}", start, end, len).into());
        }
        Ok(Value::String(s.chars().skip(start).take(end - start).collect()))
    }
}

/// Reads `[start:end]` after `_substr_`.
fn install_substring(
    parser: &mut Parser<'_>,
    const_eligible: bool,
    inner: Expression,
) -> Result<(bool, Expression), ParseError> {
    parser.expect(TokenKind::OpenBracket, "`[` after _substr_")?;
    let start = substring_bound(parser)?;
    parser.expect(TokenKind::Colon, "`:` in _substr_ range")?;
    let end = substring_bound(parser)?;
    parser.expect(TokenKind::CloseBracket, "`]` after _substr_ range")?;

    let coercion = Arc::new(Substring::new(start, end));
    Ok((const_eligible, Expression::coerce(inner, coercion, const_eligible)))
}

fn substring_bound(parser: &mut Parser<'_>) -> Result<Option<usize>, ParseError> {
    if parser.peek_kind()? != Some(TokenKind::Number) {
        return Ok(None);
    }
    let Some(token) = parser.next_token()? else {
        return Ok(None);
    };

    let text = parser.token_text(&token);
    match text.parse::<usize>() {
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(ParseError::Coercion {
            name: "_substr_".to_string(),
            reason: format!("bound `{}` is not a non-negative integer", text),
        }),
    }
}
