use super::*;
use crate::Bin;
use crate::BinValue;
use crate::PolicyError;
use crate::Value;

fn entry(parts: Vec<Value>) -> Value {
    Value::Tuple(parts)
}

fn bins() -> Vec<Bin> {
    vec![
        Bin {
            name: "status".to_string(),
            value: BinValue::Str("active".to_string()),
        },
        Bin {
            name: "age".to_string(),
            value: BinValue::Int(30),
        },
    ]
}

fn compile(entries: Vec<Value>) -> Expression {
    Expression::compile(&Value::List(entries)).unwrap().unwrap()
}

#[test]
fn nil_and_empty_lists_compile_to_nothing() {
    assert_eq!(Expression::compile(&Value::Nil), Ok(None));
    assert_eq!(Expression::compile(&Value::List(vec![])), Ok(None));
}

#[test]
fn all_predicates_must_hold() {
    let expression = compile(vec![
        entry(vec!["eq".into(), "status".into(), "active".into()]),
        entry(vec!["gt".into(), "age".into(), Value::from(17)]),
        entry(vec!["exists".into(), "age".into()]),
        entry(vec!["not_exists".into(), "email".into()]),
    ]);
    assert_eq!(expression.predicates().len(), 4);
    assert!(expression.matches(&bins()));

    let expression = compile(vec![
        entry(vec!["eq".into(), "status".into(), "active".into()]),
        entry(vec!["lt".into(), "age".into(), Value::from(18)]),
    ]);
    assert!(!expression.matches(&bins()));
}

#[test]
fn comparisons_mix_ints_and_floats() {
    assert!(compile(vec![entry(vec!["gt".into(), "age".into(), Value::from(29.5)])]).matches(&bins()));
    assert!(compile(vec![entry(vec!["ne".into(), "age".into(), Value::from(31)])]).matches(&bins()));
}

#[test]
fn ordering_against_other_types_never_matches() {
    let expression = compile(vec![entry(vec!["gt".into(), "status".into(), Value::from(1)])]);

    assert!(!expression.matches(&bins()));
    assert!(!compile(vec![entry(vec!["gt".into(), "missing".into(), Value::from(1)])]).matches(&bins()));
}

#[test]
fn malformed_entries_are_rejected() {
    let reject = |value: Value| matches!(Expression::compile(&value), Err(PolicyError::Expression(_)));

    assert!(reject(Value::from("eq")));
    assert!(reject(Value::List(vec![Value::from(1)])));
    assert!(reject(Value::List(vec![entry(vec!["eq".into()])])));
    assert!(reject(Value::List(vec![entry(vec!["eq".into(), "a".into()])])));
    assert!(reject(Value::List(vec![entry(vec!["exists".into(), "a".into(), Value::from(1)])])));
    assert!(reject(Value::List(vec![entry(vec!["like".into(), "a".into(), Value::from(1)])])));
    assert!(reject(Value::List(vec![entry(vec![
        "eq".into(),
        "a".into(),
        Value::Tuple(vec![]),
    ])])));
}
