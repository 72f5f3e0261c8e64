//! Resolved permission sets and qualified permission names

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Permission name, optionally qualified by a parameter constraint
///
/// `order_edit?status=1&type=2` grants `order_edit` only for requests whose
/// parameters include `status=1` and `type=2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// The full entry as granted
    pub raw: String,

    /// Name before the first `?`
    pub name: String,

    /// Parsed constraint; `None` for unqualified names. `Some(Err(()))` when the
    /// query part cannot be decoded, which never matches.
    constraint: Option<Result<BTreeMap<String, String>, ()>>,
}

impl QualifiedName {
    /// Parse a permission entry (already lower-cased)
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('?') {
            None => Self {
                raw: raw.to_string(),
                name: raw.to_string(),
                constraint: None,
            },
            Some((name, query)) => {
                let constraint = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
                    .map(|pairs| pairs.into_iter().collect::<BTreeMap<_, _>>())
                    .map_err(|e| {
                        debug!("Unparseable permission qualifier in '{}': {}", raw, e);
                    });
                Self {
                    raw: raw.to_string(),
                    name: name.to_string(),
                    constraint: Some(constraint),
                }
            }
        }
    }

    /// Whether the entry carries a `?` constraint
    pub fn is_qualified(&self) -> bool {
        self.constraint.is_some()
    }

    /// Decoded constraint pairs, if the entry is qualified and well-formed
    pub fn constraint(&self) -> Option<&BTreeMap<String, String>> {
        match &self.constraint {
            Some(Ok(map)) => Some(map),
            _ => None,
        }
    }

    /// Whether the constraint decoded successfully (unqualified names are valid)
    pub fn is_well_formed(&self) -> bool {
        !matches!(self.constraint, Some(Err(())))
    }
}

/// Lower-cased, deduplicated set of permission names held by a user
///
/// Insertion order is preserved. Entries are parsed once on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PermissionSet {
    entries: Vec<QualifiedName>,
}

impl PermissionSet {
    /// Build a set from raw names; names are lower-cased and deduplicated
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let entries = names
            .into_iter()
            .map(|n| n.as_ref().to_lowercase())
            .filter(|n| seen.insert(n.clone()))
            .map(|n| QualifiedName::parse(&n))
            .collect();
        Self { entries }
    }

    /// Empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the exact (lower-cased) entry is present
    pub fn contains(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.entries.iter().any(|e| e.raw == name)
    }

    /// Parsed entries
    pub fn entries(&self) -> &[QualifiedName] {
        &self.entries
    }

    /// Raw entry names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.raw.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<String>> for PermissionSet {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<PermissionSet> for Vec<String> {
    fn from(set: PermissionSet) -> Self {
        set.entries.into_iter().map(|e| e.raw).collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
