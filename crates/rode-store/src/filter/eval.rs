//! Filter evaluation against JSON documents.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use super::{CompareOp, Expr, Function, Operand};

impl Expr {
    pub fn matches(&self, source: &Value) -> bool {
        match self {
            Self::Compare { left, op, right } => {
                let left = resolve(left, source);
                let right = resolve(right, source);
                compare(*op, &left, &right)
            }
            Self::Call {
                field,
                function,
                argument,
            } => match (lookup(source, field), function) {
                (Some(Value::String(s)), Function::StartsWith) => s.starts_with(argument.as_str()),
                (Some(Value::String(s)), Function::Contains) => s.contains(argument.as_str()),
                (Some(Value::Array(items)), Function::Contains) => items
                    .iter()
                    .any(|item| item.as_str() == Some(argument.as_str())),
                _ => false,
            },
            Self::Truthy(operand) => matches!(resolve(operand, source), Value::Bool(true)),
            Self::And(left, right) => left.matches(source) && right.matches(source),
            Self::Or(left, right) => left.matches(source) || right.matches(source),
            Self::Not(inner) => !inner.matches(source),
        }
    }
}

/// Missing fields resolve to `null`.
fn resolve(operand: &Operand, source: &Value) -> Value {
    match operand {
        Operand::Field(path) => lookup(source, path).cloned().unwrap_or(Value::Null),
        Operand::Literal(value) => value.clone(),
    }
}

pub(crate) fn lookup<'a>(source: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(source, |value, segment| value.as_object()?.get(segment))
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Neq => !values_equal(left, right),
        CompareOp::Lt => compare_values(left, right) == Some(Ordering::Less),
        CompareOp::Lte => matches!(
            compare_values(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => compare_values(left, right) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            compare_values(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// Order two JSON scalars. Values of different types are unordered.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(a.cmp(b)),
        },
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
