//! In-memory folds shared by the collection and deferred backends.
//!
//! Nulls are skipped. `sum` of nothing is `0`; the other folds yield `Null`.

use std::cmp::Ordering;

use bigdecimal::BigDecimal;

use crate::schema::FieldKind;
use crate::value::Value;

/// Sum/Avg: only numbers participate, so the field kind is irrelevant.
pub type NumericFold = fn(&mut dyn Iterator<Item = Value>) -> Value;

/// Min/Max: the field kind supplies the ordering.
pub type OrderedFold = fn(FieldKind, &mut dyn Iterator<Item = Value>) -> Value;

fn numbers(values: &mut dyn Iterator<Item = Value>) -> impl Iterator<Item = BigDecimal> + '_ {
    values.filter_map(|v| match v {
        Value::Number(n) => Some(n),
        _ => None,
    })
}

pub fn sum(values: &mut dyn Iterator<Item = Value>) -> Value {
    Value::Number(numbers(values).fold(BigDecimal::from(0), |acc, n| acc + n))
}

pub fn average(values: &mut dyn Iterator<Item = Value>) -> Value {
    let (total, count) = numbers(values).fold((BigDecimal::from(0), 0_u64), |(acc, n), v| {
        (acc + v, n + 1)
    });
    if count == 0 {
        return Value::Null;
    }
    Value::Number(total / BigDecimal::from(count))
}

fn extreme(kind: FieldKind, values: &mut dyn Iterator<Item = Value>, keep: Ordering) -> Value {
    values
        .filter(|v| !v.is_null())
        .fold(None, |best: Option<Value>, v| match best {
            Some(b) if kind.order(&v, &b) != Some(keep) => Some(b),
            _ => Some(v),
        })
        .unwrap_or(Value::Null)
}

pub fn min(kind: FieldKind, values: &mut dyn Iterator<Item = Value>) -> Value {
    extreme(kind, values, Ordering::Less)
}

pub fn max(kind: FieldKind, values: &mut dyn Iterator<Item = Value>) -> Value {
    extreme(kind, values, Ordering::Greater)
}
