//! Runtime values and loose comparison rules
//!
//! Attribute values arrive as JSON and are compared loosely: numeric strings
//! compare as numbers, booleans compare by truthiness, and `null` equals any
//! falsy value. `===` / `!==` opt into strict comparison.

use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;

use super::error::{ConditionError, Result};

/// Value produced while evaluating a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Convert a JSON attribute value. Objects are rejected.
    pub fn from_json(name: &str, json: &JsonValue) -> Result<Self> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Array(items) => Value::List(
                items
                    .iter()
                    .map(|item| Value::from_json(name, item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            JsonValue::Object(_) => {
                return Err(ConditionError::UnsupportedValue(name.to_string()))
            }
        })
    }

    /// Truthiness: `null`, `false`, `0`, `0.0`, `""`, `"0"` and `[]` are falsy
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !(s.is_empty() || s == "0"),
            Value::List(items) => !items.is_empty(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => numeric_str(s),
            _ => None,
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Loose equality (`==`)
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(b), o) | (o, Value::Bool(b)) => *b == o.truthy(),
            (Value::Null, Value::Str(s)) | (Value::Str(s), Value::Null) => s.is_empty(),
            (Value::Null, o) | (o, Value::Null) => !o.truthy(),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::List(_), _) | (_, Value::List(_)) => false,
            (Value::Str(a), Value::Str(b)) => match (numeric_str(a), numeric_str(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => a.to_string() == b.to_string(),
            },
        }
    }

    /// Strict equality (`===`): same kind and same value
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b) && a == b,
        }
    }

    /// Loose ordering used by `<`, `<=`, `>`, `>=`
    pub fn loose_cmp(&self, other: &Value) -> Result<Ordering> {
        let ordering = match (self, other) {
            (Value::List(_), _) | (_, Value::List(_)) => None,
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(_), _) | (_, Value::Bool(_)) | (Value::Null, _) | (_, Value::Null) => {
                Some(self.truthy().cmp(&other.truthy()))
            }
            (Value::Str(a), Value::Str(b)) => match (numeric_str(a), numeric_str(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => Some(a.cmp(b)),
            },
            (a, b) if a.is_number() || b.is_number() => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => Some(a.to_string().cmp(&b.to_string())),
            },
            _ => None,
        };

        ordering.ok_or_else(|| {
            ConditionError::EvaluationError(format!("cannot order {} and {}", self, other))
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("1"),
            Value::Bool(false) => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::List(_) => f.write_str("Array"),
        }
    }
}

fn numeric_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json("a", &json!(3)).unwrap(), Value::Int(3));
        assert_eq!(Value::from_json("a", &json!(1.5)).unwrap(), Value::Float(1.5));
        assert_eq!(
            Value::from_json("a", &json!(["x", 1])).unwrap(),
            Value::List(vec![Value::Str("x".into()), Value::Int(1)])
        );
        assert!(matches!(
            Value::from_json("a", &json!({"k": 1})),
            Err(ConditionError::UnsupportedValue(name)) if name == "a"
        ));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Str("0".into()).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("no".into()).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Float(0.5).truthy());
    }

    #[test]
    fn test_numeric_strings_compare_as_numbers() {
        assert!(Value::Str("10".into()).loose_eq(&Value::Int(10)));
        assert!(Value::Str("1e1".into()).loose_eq(&Value::Str("10".into())));
        assert_eq!(
            Value::Str("9".into()).loose_cmp(&Value::Str("10".into())).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::Int(150).loose_cmp(&Value::Str("100".into())).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_null_equality() {
        assert!(Value::Null.loose_eq(&Value::Bool(false)));
        assert!(Value::Null.loose_eq(&Value::Int(0)));
        assert!(Value::Null.loose_eq(&Value::Str(String::new())));
        assert!(!Value::Null.loose_eq(&Value::Str("0".into())));
        assert!(!Value::Null.loose_eq(&Value::Int(1)));
    }

    #[test]
    fn test_strict_equality() {
        assert!(Value::Int(1).strict_eq(&Value::Int(1)));
        assert!(!Value::Int(1).strict_eq(&Value::Str("1".into())));
        assert!(!Value::Int(1).strict_eq(&Value::Float(1.0)));
    }

    #[test]
    fn test_lists_cannot_be_ordered() {
        assert!(Value::List(vec![]).loose_cmp(&Value::Int(1)).is_err());
    }
}
