//! Group and rule storage

use crate::error::Result;
use crate::types::{Group, GroupId, Partition, Rule, RuleId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRuleStore;

/// Read access to groups, memberships and rules
///
/// Both operations are side-effect-free reads. Implementations report
/// unreachable backends as [`AuthError::StoreUnavailable`](crate::AuthError).
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active groups the user belongs to
    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<Group>>;

    /// Active rules whose id is in `ids` and whose type is in `partition`
    async fn rules_by_ids_and_type(&self, ids: &[RuleId], partition: &Partition) -> Result<Vec<Rule>>;
}

/// Serializable snapshot of a rule store, used to seed [`InMemoryRuleStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFixture {
    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub rules: Vec<Rule>,

    /// user id -> group ids
    #[serde(default)]
    pub members: HashMap<UserId, Vec<GroupId>>,
}

#[derive(Default)]
struct StoreData {
    groups: HashMap<GroupId, Group>,
    rules: HashMap<RuleId, Rule>,
    members: HashMap<UserId, Vec<GroupId>>,
}

/// In-memory rule store implementation
///
/// Counts the queries it serves so callers can observe cache behaviour.
#[derive(Default)]
pub struct InMemoryRuleStore {
    data: Arc<RwLock<StoreData>>,
    group_queries: AtomicUsize,
    rule_queries: AtomicUsize,
}

impl InMemoryRuleStore {
    /// Create an empty in-memory rule store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from a fixture
    pub fn from_fixture(fixture: RuleFixture) -> Self {
        let data = StoreData {
            groups: fixture
                .groups
                .into_iter()
                .map(|g| (g.id.clone(), g))
                .collect(),
            rules: fixture
                .rules
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect(),
            members: fixture.members,
        };

        Self {
            data: Arc::new(RwLock::new(data)),
            ..Self::default()
        }
    }

    /// Load a fixture from a TOML or JSON file (chosen by extension)
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let fixture: RuleFixture = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => toml::from_str(&contents).map_err(|e| {
                crate::AuthError::InvalidInput(format!(
                    "Failed to parse fixture {}: {}",
                    path.display(),
                    e
                ))
            })?,
        };
        Ok(Self::from_fixture(fixture))
    }

    /// Insert or replace a group
    pub async fn put_group(&self, group: Group) {
        let mut data = self.data.write().await;
        data.groups.insert(group.id.clone(), group);
    }

    /// Insert or replace a rule
    pub async fn put_rule(&self, rule: Rule) {
        let mut data = self.data.write().await;
        data.rules.insert(rule.id.clone(), rule);
    }

    /// Add a user to a group
    pub async fn add_member(&self, user_id: impl Into<UserId>, group_id: impl Into<GroupId>) {
        let mut data = self.data.write().await;
        let groups = data.members.entry(user_id.into()).or_default();
        let group_id = group_id.into();
        if !groups.contains(&group_id) {
            groups.push(group_id);
        }
    }

    /// Remove a user from a group
    pub async fn remove_member(&self, user_id: &str, group_id: &str) {
        let mut data = self.data.write().await;
        if let Some(groups) = data.members.get_mut(user_id) {
            groups.retain(|g| g != group_id);
        }
    }

    /// Number of `groups_for_user` calls served
    pub fn group_queries(&self) -> usize {
        self.group_queries.load(Ordering::Relaxed)
    }

    /// Number of `rules_by_ids_and_type` calls served
    pub fn rule_queries(&self) -> usize {
        self.rule_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<Group>> {
        self.group_queries.fetch_add(1, Ordering::Relaxed);

        let data = self.data.read().await;
        let Some(group_ids) = data.members.get(user_id) else {
            return Ok(Vec::new());
        };

        Ok(group_ids
            .iter()
            .filter_map(|id| data.groups.get(id))
            .filter(|g| g.active)
            .cloned()
            .collect())
    }

    async fn rules_by_ids_and_type(&self, ids: &[RuleId], partition: &Partition) -> Result<Vec<Rule>> {
        self.rule_queries.fetch_add(1, Ordering::Relaxed);

        let data = self.data.read().await;
        let mut seen = HashSet::new();

        Ok(ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| data.rules.get(id))
            .filter(|r| r.active && partition.contains(r.rule_type))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryRuleStore {
        let store = InMemoryRuleStore::new();
        store.put_group(Group::from_rule_list("editors", "1,2")).await;
        store.put_group(Group::from_rule_list("retired", "3").inactive()).await;
        store.put_rule(Rule::new("1", "order_edit")).await;
        store.put_rule(Rule::new("2", "order_view").inactive()).await;
        store.put_rule(Rule::new("3", "report_view").with_type(2)).await;
        store.add_member("alice", "editors").await;
        store.add_member("alice", "retired").await;
        store
    }

    #[tokio::test]
    async fn test_groups_filter_inactive() {
        let store = seeded().await;

        let groups = store.groups_for_user("alice").await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "editors");

        assert!(store.groups_for_user("nobody").await.unwrap().is_empty());
        assert_eq!(store.group_queries(), 2);
    }

    #[tokio::test]
    async fn test_rules_filter_by_active_and_type() {
        let store = seeded().await;
        let ids: Vec<RuleId> = vec!["1".into(), "2".into(), "3".into(), "1".into()];

        let rules = store.rules_by_ids_and_type(&ids, &Partition::default()).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "order_edit");

        let rules = store
            .rules_by_ids_and_type(&ids, &Partition::new(vec![1, 2]))
            .await
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(store.rule_queries(), 2);
    }

    #[tokio::test]
    async fn test_remove_member() {
        let store = seeded().await;
        store.remove_member("alice", "editors").await;
        assert!(store.groups_for_user("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_fixture() {
        let fixture: RuleFixture = toml::from_str(
            r#"
            [[groups]]
            id = "1"
            name = "editors"
            rule_ids = ["10", "11"]

            [[rules]]
            id = "10"
            name = "Order_Edit"

            [[rules]]
            id = "11"
            name = "order_audit"
            type = 2
            condition = "{score} > 10"

            [members]
            alice = ["1"]
            "#,
        )
        .unwrap();

        let store = InMemoryRuleStore::from_fixture(fixture);
        let groups = store.groups_for_user("alice").await.unwrap();
        assert_eq!(groups[0].rule_ids, vec!["10", "11"]);

        let rules = store
            .rules_by_ids_and_type(&groups[0].rule_ids, &Partition::from(2))
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].condition.as_deref(), Some("{score} > 10"));
    }
}
