// tests/integration_tests.rs

use std::{sync::Arc, thread};

use express_lang::{EvalError, Value, parse};

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

const COMPANY: &str = r#"{"name":"MyCompany","properties":{"employees":50,"tags":["a","b"]},"active":true}"#;

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_arithmetic_groups_left_to_right() {
    assert_eq!(eval_ok("1 + 1", "{}"), Value::Float(2.0));
    assert_eq!(eval_ok("(1 + 1) / 2", "{}"), Value::Float(1.0));
    assert_eq!(eval_ok("2 * 2 + 1", "{}"), Value::Float(5.0));
    // No precedence: (1 + 2) * 3
    assert_eq!(eval_ok("1 + 2 * 3", "{}"), Value::Float(9.0));
    assert_eq!(eval_ok("1 + (2 * 3)", "{}"), Value::Float(7.0));
    assert_eq!(eval_ok("10 - -2", "{}"), Value::Float(12.0));
}

#[test]
fn test_division_follows_ieee() {
    assert_eq!(eval_ok("1 / 0", "{}"), Value::Float(f64::INFINITY));
    match eval_ok("0 / 0", "{}") {
        Value::Float(n) => assert!(n.is_nan()),
        other => panic!("Expected number, got {:?}", other),
    }
}

#[test]
fn test_string_concatenation() {
    let document = r#"{"first_name":"Joey","last_name":"Bloggs"}"#;
    assert_eq!(eval_ok(r#".first_name + " " + .last_name"#, document), s("Joey Bloggs"));
    // A missing field leaves the other side unchanged
    assert_eq!(eval_ok(r#".missing + "x""#, document), s("x"));
}

#[test]
fn test_mixed_type_arithmetic_fails() {
    let err = eval(r#"1 + "a""#, "{}").unwrap_err();
    match err {
        EvalError::UnsupportedTypeComparison(msg) => assert_eq!(msg, "number + string"),
        other => panic!("Expected type error, got {:?}", other),
    }
    assert!(matches!(
        eval(r#""a" - "b""#, "{}"),
        Err(EvalError::UnsupportedTypeComparison(_))
    ));
}

// ============================================================================
// Selectors and Comparison
// ============================================================================

#[test]
fn test_selector_comparison() {
    assert_eq!(eval_ok(".properties.employees > 20", COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(".properties.employees >= 50", COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(".properties.employees < 50", COMPANY), Value::Boolean(false));
    assert_eq!(eval_ok(r#".name == "MyCompany""#, COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(r#".name != "MyCompany""#, COMPANY), Value::Boolean(false));
}

#[test]
fn test_non_ascii_selector_keys() {
    assert_eq!(eval_ok(".città == 1", r#"{"città":1}"#), Value::Boolean(true));
    assert_eq!(eval_ok(".Åse.Šum", r#"{"Åse":{"Šum":"ok"}}"#), s("ok"));
}

#[test]
fn test_missing_field_comparison_fails() {
    let err = eval(".properties.employees > 20", r#"{"properties":{}}"#).unwrap_err();
    assert!(matches!(err, EvalError::UnsupportedTypeComparison(_)));
}

#[test]
fn test_missing_field_equals_null() {
    assert_eq!(eval_ok(".nope == NULL", COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(".name.deeper", COMPANY), Value::Null);
}

#[test]
fn test_array_index_segments() {
    assert_eq!(eval_ok(".properties.tags.1", COMPANY), s("b"));
    assert_eq!(eval_ok(".properties.tags.7", COMPANY), Value::Null);
}

#[test]
fn test_whole_object_selection() {
    match eval_ok(".properties", COMPANY) {
        Value::Object(map) => assert_eq!(map.get("employees"), Some(&Value::Float(50.0))),
        other => panic!("Expected object, got {:?}", other),
    }
}

#[test]
fn test_string_ordering() {
    assert_eq!(eval_ok(r#""apple" < "banana""#, "{}"), Value::Boolean(true));
    assert!(matches!(
        eval(r#""apple" < 1"#, "{}"),
        Err(EvalError::UnsupportedTypeComparison(_))
    ));
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_array_equality_is_structural() {
    assert_eq!(eval_ok("[1, 2] == [1, 2]", "{}"), Value::Boolean(true));
    assert_eq!(eval_ok("[1, 2] == [2, 1]", "{}"), Value::Boolean(false));
    assert_eq!(eval_ok(r#".properties.tags == ["a", "b"]"#, COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok("[[1], []] == [[1], []]", "{}"), Value::Boolean(true));
}

#[test]
fn test_array_elements_are_evaluated() {
    assert_eq!(
        eval_ok(r#"[.name, 1 + 1]"#, COMPANY),
        Value::Array(vec![s("MyCompany"), Value::Float(2.0)])
    );
}

// ============================================================================
// Logical Operators
// ============================================================================

#[test]
fn test_logical_operators() {
    assert_eq!(eval_ok(".active && .properties.employees > 20", COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok("false || .active", COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok("!(.properties.employees != 50)", COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok("NOT .active", COMPANY), Value::Boolean(false));
}

#[test]
fn test_logical_short_circuit() {
    // The right-hand side would be a type error if evaluated.
    assert_eq!(eval_ok(r#"false && 1 + "a""#, "{}"), Value::Boolean(false));
    assert_eq!(eval_ok(r#"true || 1 + "a""#, "{}"), Value::Boolean(true));
    assert!(eval(r#"true && 1 + "a""#, "{}").is_err());
}

#[test]
fn test_or_rejects_non_boolean_left_before_right() {
    // The right-hand selector would fail on the malformed document.
    match eval("1 || .x", "{not json").unwrap_err() {
        EvalError::UnsupportedTypeComparison(msg) => assert_eq!(msg, "number ||"),
        other => panic!("Expected type error, got {:?}", other),
    }
    assert!(matches!(
        eval(r#""a" || COERCE "soon" _datetime_"#, "{}"),
        Err(EvalError::UnsupportedTypeComparison(_))
    ));
}

#[test]
fn test_logical_operands_must_be_boolean() {
    assert!(matches!(eval("true && 1", "{}"), Err(EvalError::UnsupportedTypeComparison(_))));
    assert!(matches!(eval("1 || true", "{}"), Err(EvalError::UnsupportedTypeComparison(_))));
    assert!(matches!(eval("!1", "{}"), Err(EvalError::UnsupportedTypeComparison(_))));
}

// ============================================================================
// String and Membership Operators
// ============================================================================

#[test]
fn test_string_operators() {
    assert_eq!(eval_ok(r#".name CONTAINS "Comp""#, COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(r#".name STARTSWITH "My""#, COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(r#".name ENDSWITH "My""#, COMPANY), Value::Boolean(false));
    assert!(matches!(
        eval(r#".name STARTSWITH 1"#, COMPANY),
        Err(EvalError::UnsupportedTypeComparison(_))
    ));
}

#[test]
fn test_membership_operators() {
    assert_eq!(eval_ok(r#""b" IN .properties.tags"#, COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(r#""z" IN ["a", "b"]"#, "{}"), Value::Boolean(false));
    assert_eq!(eval_ok(r#".properties.tags CONTAINS "a""#, COMPANY), Value::Boolean(true));
    assert_eq!(
        eval_ok(r#".properties.tags CONTAINS_ALL ["a", "b"]"#, COMPANY),
        Value::Boolean(true)
    );
    assert_eq!(
        eval_ok(r#".properties.tags CONTAINS_ANY ["x", "b"]"#, COMPANY),
        Value::Boolean(true)
    );
    assert_eq!(eval_ok(r#""abc" CONTAINS_ALL "cab""#, "{}"), Value::Boolean(true));
    assert_eq!(eval_ok(r#""abc" CONTAINS_ANY "xyz""#, "{}"), Value::Boolean(false));
    assert!(matches!(
        eval(r#""a" IN "abc""#, "{}"),
        Err(EvalError::UnsupportedTypeComparison(_))
    ));
}

// ============================================================================
// BETWEEN
// ============================================================================

#[test]
fn test_between() {
    assert_eq!(eval_ok(".properties.employees BETWEEN 10 AND 100", COMPANY), Value::Boolean(true));
    assert_eq!(eval_ok(".properties.employees BETWEEN 50 AND 100", COMPANY), Value::Boolean(false));
    assert_eq!(eval_ok(r#""b" BETWEEN "a" AND "c""#, "{}"), Value::Boolean(true));
}

#[test]
fn test_between_with_null_is_false() {
    assert_eq!(eval_ok(".missing BETWEEN 1 AND 10", COMPANY), Value::Boolean(false));
    assert_eq!(eval_ok("5 BETWEEN NULL AND 10", "{}"), Value::Boolean(false));
}

#[test]
fn test_between_mixed_types_fails() {
    assert!(matches!(
        eval(r#"5 BETWEEN "a" AND 10"#, "{}"),
        Err(EvalError::UnsupportedTypeComparison(_))
    ));
    assert!(matches!(
        eval("true BETWEEN false AND true", "{}"),
        Err(EvalError::UnsupportedTypeComparison(_))
    ));
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_malformed_document() {
    assert!(matches!(eval(".a == 1", "{not json"), Err(EvalError::MalformedDocument(_))));
}

#[test]
fn test_document_not_parsed_without_selectors() {
    assert_eq!(eval_ok("1 + 1", "{not json"), Value::Float(2.0));
    // Short-circuit keeps the selector from being reached
    assert_eq!(eval_ok("false && .a", "{not json"), Value::Boolean(false));
}

#[test]
fn test_repeated_evaluation_is_deterministic() {
    let expression = parse(b".properties.employees * 2 == 100").unwrap();
    for _ in 0..10 {
        assert_eq!(expression.calculate(COMPANY.as_bytes()).unwrap(), Value::Boolean(true));
    }
    let other = r#"{"properties":{"employees":10}}"#;
    assert_eq!(expression.calculate(other.as_bytes()).unwrap(), Value::Boolean(false));
}

#[test]
fn test_concurrent_evaluation() {
    let expression = Arc::new(parse(b".n * 2 + 1").unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let expression = Arc::clone(&expression);
            thread::spawn(move || {
                let document = format!(r#"{{"n":{}}}"#, i);
                expression.calculate(document.as_bytes()).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Value::Float(i as f64 * 2.0 + 1.0));
    }
}
