//! Current-request parameters, case-folded for matching

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::{AuthError, Result};

/// Request parameters with every key and string value lower-cased
///
/// Folding walks the structure: nested objects and arrays are folded
/// element by element, numbers, booleans and nulls are kept as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct RequestParams {
    values: Map<String, Value>,
}

impl RequestParams {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a JSON object. Non-object values yield an empty parameter set.
    pub fn from_json(value: Value) -> Self {
        match fold(value) {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    /// Parse an `application/x-www-form-urlencoded` query string
    pub fn from_query(query: &str) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| AuthError::InvalidInput(format!("Invalid query string: {}", e)))?;
        Ok(pairs.into_iter().collect())
    }

    /// Look up a folded value by (case-insensitive) key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every constrained key is present with an equal value
    ///
    /// Values are compared as strings: numbers by their decimal rendering,
    /// `true` as `"1"`, `false` and `null` as `""`. Arrays and objects never
    /// equal a scalar constraint.
    pub fn satisfies(&self, constraint: &BTreeMap<String, String>) -> bool {
        constraint.iter().all(|(key, expected)| {
            self.values
                .get(key)
                .and_then(scalar_string)
                .map(|actual| actual == *expected)
                .unwrap_or(false)
        })
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(values: Map<String, Value>) -> Self {
        Self::from_json(Value::Object(values))
    }
}

impl From<RequestParams> for Map<String, Value> {
    fn from(params: RequestParams) -> Self {
        params.values
    }
}

impl From<HashMap<String, String>> for RequestParams {
    fn from(values: HashMap<String, String>) -> Self {
        values.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values: Map<String, Value> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from(values)
    }
}

/// Recursively lower-case keys and string values
fn fold(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        Value::Array(items) => Value::Array(items.into_iter().map(fold).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), fold(v)))
                .collect(),
        ),
        other => other,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) | Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
