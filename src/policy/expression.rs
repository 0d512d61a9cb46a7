use std::cmp::Ordering;

use crate::record::native_bin_value;
use crate::Bin;
use crate::BinValue;
use crate::PolicyError;
use crate::Value;

/// One comparison against a stored bin
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Exists(String),
    NotExists(String),
    Eq(String, BinValue),
    Ne(String, BinValue),
    Gt(String, BinValue),
    Lt(String, BinValue),
}

/// Compiled filter expression attached to a write policy
///
/// The host form is a list of tuples, all of which must hold for the write to
/// proceed:
///
/// ```text
/// [("eq", "status", "active"), ("gt", "age", 17), ("exists", "email")]
/// ```
///
/// A write whose expression evaluates to false against the stored record
/// fails with [`crate::ResultCode::FilteredOut`]. Writes that create a record
/// are not filtered.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    predicates: Vec<Predicate>,
}

impl Expression {
    /// Compiles the host form. `Nil` and an empty list compile to `None`.
    pub fn compile(value: &Value) -> std::result::Result<Option<Expression>, PolicyError> {
        let items = match value {
            Value::Nil => return Ok(None),
            Value::List(items) => items,
            other => {
                return Err(PolicyError::Expression(format!(
                    "expected a list, found {}",
                    other.type_name()
                )))
            }
        };

        let predicates = items
            .iter()
            .map(compile_predicate)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if predicates.is_empty() {
            return Ok(None);
        }
        Ok(Some(Expression { predicates }))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Evaluates every predicate against the stored bins
    pub fn matches(
        &self,
        bins: &[Bin],
    ) -> bool {
        self.predicates.iter().all(|p| evaluate(p, bins))
    }
}

fn compile_predicate(item: &Value) -> std::result::Result<Predicate, PolicyError> {
    let parts = item
        .as_sequence()
        .ok_or_else(|| PolicyError::Expression(format!("expected a tuple, found {}", item.type_name())))?;

    let (op, bin) = match parts {
        [Value::Str(op), Value::Str(bin), ..] => (op.as_str(), bin.clone()),
        _ => {
            return Err(PolicyError::Expression(
                "each entry starts with an operator and a bin name".to_string(),
            ))
        }
    };

    let operand = || -> std::result::Result<BinValue, PolicyError> {
        match parts {
            [_, _, v] => native_bin_value(v).ok_or_else(|| {
                PolicyError::Expression(format!("{op}: unsupported operand type {}", v.type_name()))
            }),
            _ => Err(PolicyError::Expression(format!("{op}: expects exactly one operand"))),
        }
    };

    match op {
        "exists" | "not_exists" if parts.len() != 2 => {
            Err(PolicyError::Expression(format!("{op}: takes no operand")))
        }
        "exists" => Ok(Predicate::Exists(bin)),
        "not_exists" => Ok(Predicate::NotExists(bin)),
        "eq" => Ok(Predicate::Eq(bin, operand()?)),
        "ne" => Ok(Predicate::Ne(bin, operand()?)),
        "gt" => Ok(Predicate::Gt(bin, operand()?)),
        "lt" => Ok(Predicate::Lt(bin, operand()?)),
        other => Err(PolicyError::Expression(format!("unknown operator {other}"))),
    }
}

fn evaluate(
    predicate: &Predicate,
    bins: &[Bin],
) -> bool {
    let lookup = |name: &str| bins.iter().find(|b| b.name == name).map(|b| &b.value);

    match predicate {
        Predicate::Exists(name) => lookup(name).is_some(),
        Predicate::NotExists(name) => lookup(name).is_none(),
        Predicate::Eq(name, v) => lookup(name) == Some(v),
        Predicate::Ne(name, v) => lookup(name) != Some(v),
        Predicate::Gt(name, v) => lookup(name).and_then(|s| compare(s, v)) == Some(Ordering::Greater),
        Predicate::Lt(name, v) => lookup(name).and_then(|s| compare(s, v)) == Some(Ordering::Less),
    }
}

/// Ordering between scalars of the same family; anything else is unordered
fn compare(
    stored: &BinValue,
    operand: &BinValue,
) -> Option<Ordering> {
    match (stored, operand) {
        (BinValue::Int(a), BinValue::Int(b)) => Some(a.cmp(b)),
        (BinValue::Float(a), BinValue::Float(b)) => a.partial_cmp(b),
        (BinValue::Int(a), BinValue::Float(b)) => (*a as f64).partial_cmp(b),
        (BinValue::Float(a), BinValue::Int(b)) => a.partial_cmp(&(*b as f64)),
        (BinValue::Str(a), BinValue::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
