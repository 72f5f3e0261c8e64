//! Core authorization types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Unique user identifier
pub type UserId = String;

/// Unique group identifier
pub type GroupId = String;

/// Unique rule identifier
pub type RuleId = String;

/// Default rule type tag
pub const DEFAULT_RULE_TYPE: i32 = 1;

/// Authenticated user as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier
    pub id: UserId,

    /// Attributes referenced by rule conditions (e.g., score, department)
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl User {
    /// Create a user with no attributes
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the user
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Group (role) record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier
    pub id: GroupId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Whether the group is active
    #[serde(default = "default_true")]
    pub active: bool,

    /// Rule identifiers, as stored. May contain blanks and duplicates.
    #[serde(default)]
    pub rule_ids: Vec<RuleId>,
}

impl Group {
    /// Create an active group with the given rule identifiers
    pub fn new<I, S>(id: impl Into<GroupId>, rule_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RuleId>,
    {
        Self {
            id: id.into(),
            name: String::new(),
            active: true,
            rule_ids: rule_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an active group from the stored comma-separated rule list
    /// (e.g. `"1,2,,5,"`)
    pub fn from_rule_list(id: impl Into<GroupId>, rules: &str) -> Self {
        Self::new(id, rules.split(','))
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark the group inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Permission rule record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier
    pub id: RuleId,

    /// Permission name granted by this rule (e.g., "order_edit",
    /// "order_edit?status=1")
    pub name: String,

    /// Whether the rule is active
    #[serde(default = "default_true")]
    pub active: bool,

    /// Type tag partitioning rules into independent sets
    #[serde(rename = "type", default = "default_rule_type")]
    pub rule_type: i32,

    /// Optional condition over user attributes (e.g., "{score} > 100")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Rule {
    /// Create an active, unconditional rule of the default type
    pub fn new(id: impl Into<RuleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: true,
            rule_type: DEFAULT_RULE_TYPE,
            condition: None,
        }
    }

    /// Attach a condition expression
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the type tag
    pub fn with_type(mut self, rule_type: i32) -> Self {
        self.rule_type = rule_type;
        self
    }

    /// Mark the rule inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether the rule carries a non-blank condition
    pub fn has_condition(&self) -> bool {
        self.condition
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Set of rule type tags covered by one resolution
///
/// Tags are kept sorted and unique so that equal partitions share a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PartitionRepr", into = "PartitionRepr")]
pub struct Partition(Vec<i32>);

impl Partition {
    /// Create a partition from type tags
    pub fn new(types: impl IntoIterator<Item = i32>) -> Self {
        let mut types: Vec<i32> = types.into_iter().collect();
        types.sort_unstable();
        types.dedup();
        if types.is_empty() {
            types.push(DEFAULT_RULE_TYPE);
        }
        Self(types)
    }

    /// Type tags, sorted
    pub fn types(&self) -> &[i32] {
        &self.0
    }

    /// Whether a rule type belongs to this partition
    pub fn contains(&self, rule_type: i32) -> bool {
        self.0.binary_search(&rule_type).is_ok()
    }

    /// Comma-joined tags, used in cache and session keys
    pub fn key(&self) -> String {
        self.0
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self(vec![DEFAULT_RULE_TYPE])
    }
}

impl From<i32> for Partition {
    fn from(rule_type: i32) -> Self {
        Self(vec![rule_type])
    }
}

impl From<Vec<i32>> for Partition {
    fn from(types: Vec<i32>) -> Self {
        Self::new(types)
    }
}

impl From<&[i32]> for Partition {
    fn from(types: &[i32]) -> Self {
        Self::new(types.iter().copied())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PartitionRepr {
    One(i32),
    Many(Vec<i32>),
}

impl From<PartitionRepr> for Partition {
    fn from(repr: PartitionRepr) -> Self {
        match repr {
            PartitionRepr::One(t) => Partition::from(t),
            PartitionRepr::Many(ts) => Partition::new(ts),
        }
    }
}

impl From<Partition> for PartitionRepr {
    fn from(partition: Partition) -> Self {
        match partition.0.as_slice() {
            [single] => PartitionRepr::One(*single),
            _ => PartitionRepr::Many(partition.0),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_rule_type() -> i32 {
    DEFAULT_RULE_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let user = User::new("42")
            .with_attribute("score", 120)
            .with_attribute("department", "sales");

        assert_eq!(user.id, "42");
        assert_eq!(user.attributes.get("score"), Some(&Value::from(120)));
        assert_eq!(user.attributes.get("department"), Some(&Value::from("sales")));
    }

    #[test]
    fn test_group_from_rule_list() {
        let group = Group::from_rule_list("7", "1,2,,3,");
        assert!(group.active);
        assert_eq!(group.rule_ids, vec!["1", "2", "", "3", ""]);
    }

    #[test]
    fn test_rule_condition_detection() {
        assert!(!Rule::new("1", "order_edit").has_condition());
        assert!(!Rule::new("1", "order_edit").with_condition("  ").has_condition());
        assert!(Rule::new("1", "order_edit").with_condition("{score} > 1").has_condition());
    }

    #[test]
    fn test_partition_normalization() {
        let p = Partition::new(vec![3, 1, 3]);
        assert_eq!(p.types(), &[1, 3]);
        assert_eq!(p.key(), "1,3");
        assert!(p.contains(3));
        assert!(!p.contains(2));

        assert_eq!(Partition::default().key(), "1");
        assert_eq!(Partition::new(Vec::new()), Partition::default());
    }

    #[test]
    fn test_partition_serde() {
        let one: Partition = serde_json::from_str("2").unwrap();
        assert_eq!(one, Partition::from(2));

        let many: Partition = serde_json::from_str("[2, 1]").unwrap();
        assert_eq!(many.key(), "1,2");
        assert_eq!(serde_json::to_string(&many).unwrap(), "[1,2]");
    }
}
