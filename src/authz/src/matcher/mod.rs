//! Matching requested permission names against a resolved set
//!
//! Two modes:
//! - [`MatchMode::Plain`]: a requested name matches iff it is present verbatim.
//! - [`MatchMode::Url`]: entries of the form `name?key=value&...` match only
//!   when the current request's parameters carry every constrained pair.
//!
//! Two combination policies: [`Relation::Any`] and [`Relation::All`].

pub mod params;

pub use params::RequestParams;

use crate::permission::PermissionSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::AuthError;

/// How permission-set entries are compared against requested names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Literal name comparison
    Plain,

    /// Entries may carry a `?key=value` constraint over request parameters
    #[default]
    #[serde(alias = "url-constrained")]
    Url,
}

/// How several requested names combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// At least one requested name must match
    #[default]
    #[serde(alias = "or")]
    Any,

    /// Every requested name must match
    #[serde(alias = "and")]
    All,
}

impl FromStr for MatchMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(MatchMode::Plain),
            "url" | "url-constrained" => Ok(MatchMode::Url),
            other => Err(AuthError::InvalidInput(format!("Unknown match mode: {}", other))),
        }
    }
}

impl FromStr for Relation {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" | "or" => Ok(Relation::Any),
            "all" | "and" => Ok(Relation::All),
            other => Err(AuthError::InvalidInput(format!("Unknown relation: {}", other))),
        }
    }
}

/// Requested permission names plus matching options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    names: Vec<String>,
    pub mode: MatchMode,
    pub relation: Relation,
}

impl PermissionRequest {
    /// Request from a single string; commas separate several names
    pub fn parse(names: &str) -> Self {
        Self::from_names(names.split(','))
    }

    /// Request from pre-split names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .collect();

        Self {
            names,
            mode: MatchMode::default(),
            relation: Relation::default(),
        }
    }

    /// Set the match mode
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the combination policy
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = relation;
        self
    }

    /// Normalized requested names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Decide whether `permissions` satisfies `request` for the given parameters
///
/// Fails closed: an empty request or an empty permission set is a denial.
pub fn decide(permissions: &PermissionSet, request: &PermissionRequest, params: &RequestParams) -> bool {
    if request.is_empty() || permissions.is_empty() {
        return false;
    }

    let requested: HashSet<&str> = request.names.iter().map(String::as_str).collect();
    let mut matched: HashSet<&str> = HashSet::new();

    for entry in permissions.entries() {
        if request.mode == MatchMode::Url && entry.is_qualified() {
            let satisfied = entry
                .constraint()
                .map(|constraint| params.satisfies(constraint))
                .unwrap_or(false);
            if satisfied && requested.contains(entry.name.as_str()) {
                matched.insert(entry.name.as_str());
            }
        } else if requested.contains(entry.raw.as_str()) {
            matched.insert(entry.raw.as_str());
        }
    }

    match request.relation {
        Relation::Any => !matched.is_empty(),
        Relation::All => requested.iter().all(|name| matched.contains(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(names: &[&str]) -> PermissionSet {
        PermissionSet::new(names.iter().copied())
    }

    #[test]
    fn test_request_normalization() {
        let request = PermissionRequest::parse("Order_Edit, order_view,,ORDER_EDIT");
        assert_eq!(request.names(), &["order_edit".to_string(), "order_view".to_string()]);
        assert_eq!(request.mode, MatchMode::Url);
        assert_eq!(request.relation, Relation::Any);
    }

    #[test]
    fn test_any_and_all() {
        let perms = set(&["a", "b"]);
        let params = RequestParams::new();

        let any = PermissionRequest::from_names(["c", "a"]);
        assert!(decide(&perms, &any, &params));

        let all = any.clone().with_relation(Relation::All);
        assert!(!decide(&perms, &all, &params));

        let all_present = PermissionRequest::parse("a,b").with_relation(Relation::All);
        assert!(decide(&perms, &all_present, &params));
    }

    #[test]
    fn test_url_constraint() {
        let perms = set(&["order_edit?status=1"]);
        let request = PermissionRequest::parse("order_edit");

        let ok = RequestParams::from_json(json!({"status": "1", "id": "5"}));
        assert!(decide(&perms, &request, &ok));

        let wrong = RequestParams::from_json(json!({"status": "2"}));
        assert!(!decide(&perms, &request, &wrong));

        let missing = RequestParams::new();
        assert!(!decide(&perms, &request, &missing));
    }

    #[test]
    fn test_plain_mode_compares_whole_entry() {
        let perms = set(&["order_edit?status=1"]);
        let params = RequestParams::from_json(json!({"status": "1"}));

        let bare = PermissionRequest::parse("order_edit").with_mode(MatchMode::Plain);
        assert!(!decide(&perms, &bare, &params));

        let full = PermissionRequest::parse("order_edit?status=1").with_mode(MatchMode::Plain);
        assert!(decide(&perms, &full, &params));
    }

    #[test]
    fn test_url_mode_unqualified_entries_match_by_name() {
        let perms = set(&["order_view", "order_edit?status=1"]);
        let params = RequestParams::from_json(json!({"status": "9"}));

        let request = PermissionRequest::parse("order_view,order_edit").with_relation(Relation::All);
        assert!(!decide(&perms, &request, &params));

        let request = PermissionRequest::parse("order_view");
        assert!(decide(&perms, &request, &params));
    }

    #[test]
    fn test_constraint_values_are_case_folded() {
        let perms = set(&["Order_Edit?Status=Open"]);
        let params = RequestParams::from_json(json!({"STATUS": "OPEN"}));
        assert!(decide(&perms, &PermissionRequest::parse("ORDER_EDIT"), &params));
    }

    #[test]
    fn test_fail_closed() {
        let params = RequestParams::new();
        assert!(!decide(&PermissionSet::empty(), &PermissionRequest::parse("a"), &params));
        assert!(!decide(&set(&["a"]), &PermissionRequest::parse(" , "), &params));
    }

    #[test]
    fn test_mode_and_relation_parsing() {
        assert_eq!("url".parse::<MatchMode>().unwrap(), MatchMode::Url);
        assert_eq!("PLAIN".parse::<MatchMode>().unwrap(), MatchMode::Plain);
        assert_eq!("or".parse::<Relation>().unwrap(), Relation::Any);
        assert_eq!("and".parse::<Relation>().unwrap(), Relation::All);
        assert!("xor".parse::<Relation>().is_err());

        let mode: MatchMode = serde_json::from_str("\"url-constrained\"").unwrap();
        assert_eq!(mode, MatchMode::Url);
        let relation: Relation = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(relation, Relation::All);
    }
}
