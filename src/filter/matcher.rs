//! Predicate evaluation against documents.

use super::predicate::{Clause, CompareOp, Predicate};
use crate::types::Document;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Evaluate a predicate. All clauses must hold; an empty predicate matches.
pub fn matches(predicate: &Predicate, document: &Document) -> bool {
    predicate
        .clauses()
        .iter()
        .all(|clause| clause_matches(clause, document))
}

fn clause_matches(clause: &Clause, document: &Document) -> bool {
    let values = resolve_path(document, &clause.path);
    match clause.op {
        // Missing fields never satisfy anything, `ne` included.
        CompareOp::Ne => {
            !values.is_empty()
                && values
                    .iter()
                    .all(|v| !value_satisfies(v, CompareOp::Eq, &clause.literal))
                && values
                    .iter()
                    .any(|v| value_satisfies(v, CompareOp::Ne, &clause.literal))
        }
        op => values.iter().any(|v| value_satisfies(v, op, &clause.literal)),
    }
}

/// Look up a dotted path through nested documents.
///
/// A segment that lands on an array continues into each embedded document
/// in it, so `a.b` reaches every `b` in `{a: [{b: 1}, {b: 2}]}`. Returns an
/// empty list when nothing is found.
pub fn resolve_path<'a>(document: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut segments = path.split('.');
    let mut found = Vec::new();
    if let Some(value) = segments.next().and_then(|first| document.get(first)) {
        collect_path(value, segments, &mut found);
    }
    found
}

fn collect_path<'a>(
    value: &'a Value,
    mut segments: std::str::Split<'_, char>,
    found: &mut Vec<&'a Value>,
) {
    let Some(segment) = segments.next() else {
        found.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(segment) {
                collect_path(next, segments, found);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter_map(Value::as_object) {
                if let Some(next) = item.get(segment) {
                    collect_path(next, segments.clone(), found);
                }
            }
        }
        _ => {}
    }
}

fn value_satisfies(value: &Value, op: CompareOp, literal: &Value) -> bool {
    match value {
        // Array fields match element-wise against scalar literals.
        Value::Array(items) if !literal.is_array() => match op {
            CompareOp::Ne => {
                let mut comparable = false;
                for item in items {
                    match compare_values(item, literal) {
                        Some(Ordering::Equal) => return false,
                        Some(_) => comparable = true,
                        None => {}
                    }
                }
                comparable
            }
            _ => items.iter().any(|item| scalar_satisfies(item, op, literal)),
        },
        _ => scalar_satisfies(value, op, literal),
    }
}

fn scalar_satisfies(value: &Value, op: CompareOp, literal: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(value, literal),
        CompareOp::Ne => same_kind(value, literal) && !values_equal(value, literal),
        CompareOp::Gt => compare_values(value, literal).is_some_and(|o| o.is_gt()),
        CompareOp::Gte => compare_values(value, literal).is_some_and(|o| o.is_ge()),
        CompareOp::Lt => compare_values(value, literal).is_some_and(|o| o.is_lt()),
        CompareOp::Lte => compare_values(value, literal).is_some_and(|o| o.is_le()),
    }
}

/// Order two scalars of the same semantic type. `None` means incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Deep equality; numbers compare by value so `1 == 1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| values_equal(l, r)))
        }
        _ => compare_values(a, b) == Some(Ordering::Equal),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (exact_integer(x), exact_integer(y)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        (Some(a), None) => compare_integer_float(a, y.as_f64()?),
        (None, Some(b)) => compare_integer_float(b, x.as_f64()?).map(Ordering::reverse),
        (None, None) => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn exact_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Compare an integer against a float without rounding the integer.
fn compare_integer_float(int: i128, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    let floor = float.floor();
    // Beyond the i64/u64 range every integer sits on one side.
    if floor.abs() >= 1.0e20 {
        return Some(if float > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    match int.cmp(&(floor as i128)) {
        Ordering::Equal if float > floor => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}
