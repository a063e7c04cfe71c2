// tests/coercion_tests.rs

use std::sync::Arc;

use express_lang::ast::{Expression, TokenKind};
use express_lang::coerce::{self, CoerceError, Coercion, RegistryError};
use express_lang::{EvalError, ParseError, Value, parse};

fn eval(src: &str, document: &str) -> Result<Value, EvalError> {
    parse(src.as_bytes())
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", src, e))
        .calculate(document.as_bytes())
}

fn eval_ok(src: &str, document: &str) -> Value {
    eval(src, document).unwrap_or_else(|e| panic!("failed to evaluate {:?}: {}", src, e))
}

fn s(v: &str) -> Value {
    Value::String(v.to_string())
}

/// Replaces every character of a string with `*`.
struct Star;

impl Coercion for Star {
    fn name(&self) -> &str {
        "_star_"
    }

    fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
        match value {
            Value::String(s) => Ok(Value::String("*".repeat(s.chars().count()))),
            other => Err(format!("cannot star a {}", other.type_name()).into()),
        }
    }
}

// ============================================================================
// _datetime_
// ============================================================================

#[test]
fn test_datetime_equality() {
    let src = "COERCE .dt1 _datetime_ == COERCE .dt2 _datetime_";
    let same = r#"{"dt1":"2022-01-02","dt2":"2022-01-02T00:00:00Z"}"#;
    let different = r#"{"dt1":"2022-01-02","dt2":"2022-01-03"}"#;

    assert_eq!(eval_ok(src, same), Value::Boolean(true));
    assert_eq!(eval_ok(src, different), Value::Boolean(false));
}

#[test]
fn test_datetime_ordering() {
    let document = r#"{"created":"2022-06-01T12:00:00+02:00"}"#;
    assert_eq!(
        eval_ok(r#"COERCE .created _datetime_ > COERCE "2022-01-01" _datetime_"#, document),
        Value::Boolean(true)
    );
    assert_eq!(
        eval_ok(
            r#"COERCE .created _datetime_ BETWEEN COERCE "2022-01-01" _datetime_ AND COERCE "2023-01-01" _datetime_"#,
            document
        ),
        Value::Boolean(true)
    );
}

#[test]
fn test_datetime_invalid_input() {
    let err = eval("COERCE .dt _datetime_", r#"{"dt":"not a date"}"#).unwrap_err();
    match err {
        EvalError::InvalidCoerce { name, .. } => assert_eq!(name, "_datetime_"),
        other => panic!("Expected coercion error, got {:?}", other),
    }
    assert!(matches!(
        eval("COERCE 42 _datetime_", "{}"),
        Err(EvalError::InvalidCoerce { .. })
    ));
}

#[test]
fn test_datetime_null_passes_through() {
    assert_eq!(eval_ok("COERCE .missing _datetime_", "{}"), Value::Null);
}

// ============================================================================
// Other Built-ins
// ============================================================================

#[test]
fn test_case_coercions() {
    let document = r#"{"name":"joey BLOGGS"}"#;
    assert_eq!(eval_ok("COERCE .name _lowercase_", document), s("joey bloggs"));
    assert_eq!(eval_ok("COERCE .name _uppercase_", document), s("JOEY BLOGGS"));
    assert_eq!(eval_ok("COERCE .name _title_", document), s("Joey Bloggs"));
    assert_eq!(
        eval_ok(r#"COERCE .name _lowercase_ == "joey bloggs""#, document),
        Value::Boolean(true)
    );
}

#[test]
fn test_string_and_number_coercions() {
    let document = r#"{"count":"42","flag":true,"n":7}"#;
    assert_eq!(eval_ok("COERCE .count _number_ + 1", document), Value::Float(43.0));
    assert_eq!(eval_ok("COERCE .flag _number_", document), Value::Float(1.0));
    assert_eq!(eval_ok(r#"COERCE .n _string_ + "!""#, document), s("7!"));
    assert!(matches!(
        eval(r#"COERCE "abc" _number_"#, "{}"),
        Err(EvalError::InvalidCoerce { .. })
    ));
}

#[test]
fn test_substr() {
    let document = r#"{"name":"MyCompany"}"#;
    assert_eq!(eval_ok("COERCE .name _substr_[0:2]", document), s("My"));
    assert_eq!(eval_ok("COERCE .name _substr_[2:]", document), s("Company"));
    assert_eq!(eval_ok("COERCE .name _substr_[:2] _uppercase_", document), s("MY"));
    assert!(matches!(
        eval("COERCE .name _substr_[5:50]", document),
        Err(EvalError::InvalidCoerce { ref name, .. }) if name == "_substr_[5:50]"
    ));
}

#[test]
fn test_chained_coercions_apply_left_to_right() {
    let document = r#"{"name":"hello WORLD"}"#;
    assert_eq!(eval_ok("COERCE .name _uppercase_ _title_", document), s("Hello World"));
    assert_eq!(eval_ok("COERCE .name _title_ _uppercase_", document), s("HELLO WORLD"));
}

#[test]
fn test_error_source_is_kept() {
    use std::error::Error;

    let err = eval("COERCE .dt _datetime_", r#"{"dt":"soon"}"#).unwrap_err();
    assert!(err.source().is_some());
    assert!(err.to_string().contains("_datetime_"));
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_custom_coercion_registration() {
    let err = parse(b"COERCE .name _star_").unwrap_err();
    assert!(matches!(err, ParseError::InvalidCoerce { ref name, .. } if name == "_star_"));

    coerce::register_value_coercion(Star).unwrap();

    assert_eq!(eval_ok("COERCE .name _star_", r#"{"name":"abc"}"#), s("***"));
    assert!(matches!(
        eval("COERCE .n _star_", r#"{"n":1}"#),
        Err(EvalError::InvalidCoerce { .. })
    ));
    assert!(coerce::registered_coercions().iter().any(|n| n == "_star_"));
}

#[test]
fn test_invalid_registration_names() {
    for name in ["plain", "_half", "__", "_with space_"] {
        let result = coerce::register_coercion(name, |_, c, e| Ok((c, e)));
        assert!(matches!(result, Err(RegistryError::InvalidName(_))), "accepted {}", name);
    }
}

#[test]
fn test_installer_reads_arguments() {
    // `_repeat_ N` repeats a string N times and is never const-eligible.
    coerce::register_coercion("_repeat_", |parser, _const_eligible, inner| {
        let token = parser.expect(TokenKind::Number, "repeat count")?;
        let text = parser.token_text(&token);
        let count: usize = text.parse().map_err(|_| ParseError::Coercion {
            name: "_repeat_".to_string(),
            reason: format!("bad count `{}`", text),
        })?;
        Ok((false, Expression::coerce(inner, Arc::new(Repeat(count)), false)))
    })
    .unwrap();

    let expression = parse(br#"COERCE "ab" _repeat_ 3 == "ababab""#).unwrap();
    assert!(!expression.is_const_eligible());
    assert_eq!(expression.calculate(b"{}").unwrap(), Value::Boolean(true));

    assert!(matches!(
        parse(br#"COERCE "ab" _repeat_"#),
        Err(ParseError::UnexpectedEof { .. })
    ));
    assert!(matches!(
        parse(br#"COERCE "ab" _repeat_ 1.5"#),
        Err(ParseError::Coercion { .. })
    ));
}

struct Repeat(usize);

impl Coercion for Repeat {
    fn name(&self) -> &str {
        "_repeat_"
    }

    fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
        match value {
            Value::String(s) => Ok(Value::String(s.repeat(self.0))),
            other => Err(format!("cannot repeat a {}", other.type_name()).into()),
        }
    }
}
