//! User -> permission set
//!
//! Resolution order for one (user, partition):
//! 1. in-process cache
//! 2. session store, when configured for per-login resolution
//! 3. groups -> rule ids -> rules -> condition evaluation
//!
//! A freshly computed set is cached in-process and, in per-login mode,
//! written to the session. A session-held list is reused until the session
//! ends or [`RuleResolver::forget_session`] is called, even when the
//! underlying groups or rules change in the meantime.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{bounded, GroupResolver};
use crate::cache::ResolutionCache;
use crate::condition::ConditionEngine;
use crate::config::{AuthConfig, AuthMode};
use crate::error::Result;
use crate::permission::PermissionSet;
use crate::session::{session_key, SessionStore};
use crate::store::RuleStore;
use crate::types::{Group, Partition, Rule, RuleId, User};

/// Resolves the permission names a user holds
#[derive(Clone)]
pub struct RuleResolver {
    groups: GroupResolver,
    store: Arc<dyn RuleStore>,
    cache: ResolutionCache,
    conditions: ConditionEngine,
    mode: AuthMode,
    timeout: Duration,
}

impl RuleResolver {
    /// Create a resolver over `store`, memoizing into `cache`
    pub fn new(store: Arc<dyn RuleStore>, cache: ResolutionCache, config: &AuthConfig) -> Self {
        let timeout = config.store_timeout();
        Self {
            groups: GroupResolver::new(store.clone(), cache.clone(), timeout),
            store,
            cache,
            conditions: ConditionEngine::new(),
            mode: config.mode,
            timeout,
        }
    }

    /// Group resolver sharing this resolver's store and cache
    pub fn group_resolver(&self) -> &GroupResolver {
        &self.groups
    }

    /// Condition engine used for rule conditions
    pub fn conditions(&self) -> &ConditionEngine {
        &self.conditions
    }

    /// Resolve the permission set of `user` for rules in `partition`
    ///
    /// Rules whose condition evaluates false, or fails to evaluate, grant
    /// nothing. Names are lower-cased and deduplicated.
    ///
    /// # Errors
    ///
    /// Store failures and timeouts are returned as `StoreUnavailable`.
    /// Session read or write failures are logged and otherwise ignored.
    pub async fn resolve_permissions(
        &self,
        user: &User,
        partition: &Partition,
        session: Option<&dyn SessionStore>,
    ) -> Result<Arc<PermissionSet>> {
        if let Some(set) = self.cache.get_permissions(&user.id, partition) {
            debug!("Permission cache hit for user {} [{}]", user.id, partition);
            return Ok(set);
        }

        let session = session.filter(|_| self.mode == AuthMode::PerLogin);

        if let Some(session) = session {
            if let Some(set) = self.load_from_session(session, user, partition).await {
                let set = Arc::new(set);
                self.cache.put_permissions(&user.id, partition, set.clone());
                return Ok(set);
            }
        }

        let groups = self.groups.resolve_groups(user).await?;
        let rule_ids = collect_rule_ids(&groups);

        if rule_ids.is_empty() {
            debug!("User {} has no rule ids in any group", user.id);
            let set = Arc::new(PermissionSet::empty());
            self.cache.put_permissions(&user.id, partition, set.clone());
            return Ok(set);
        }

        let rules = bounded(
            self.timeout,
            "rule lookup",
            self.store.rules_by_ids_and_type(&rule_ids, partition),
        )
        .await?;

        let set = Arc::new(PermissionSet::new(self.granted_names(user, &rules)));

        info!(
            "Resolved {} permissions for user {} from {} groups [{}]",
            set.len(),
            user.id,
            groups.len(),
            partition
        );

        self.cache.put_permissions(&user.id, partition, set.clone());

        if let Some(session) = session {
            self.store_in_session(session, user, partition, &set).await;
        }

        Ok(set)
    }

    /// Remove a user's persisted list from `session`
    pub async fn forget_session(
        &self,
        session: &dyn SessionStore,
        user_id: &str,
        partition: &Partition,
    ) -> Result<()> {
        session.remove(&session_key(user_id, partition)).await
    }

    fn granted_names<'a>(&self, user: &User, rules: &'a [Rule]) -> Vec<&'a str> {
        rules
            .iter()
            .filter(|rule| rule.active)
            .filter(|rule| self.condition_holds(user, rule))
            .map(|rule| rule.name.as_str())
            .collect()
    }

    fn condition_holds(&self, user: &User, rule: &Rule) -> bool {
        let Some(condition) = rule.condition.as_deref().filter(|c| !c.trim().is_empty()) else {
            return true;
        };

        match self.conditions.evaluate_expression(condition, &user.attributes) {
            Ok(holds) => {
                if !holds {
                    debug!("Condition on rule {} is false for user {}", rule.id, user.id);
                }
                holds
            }
            Err(e) => {
                warn!(
                    "Condition on rule {} failed for user {}, not granting: {}",
                    rule.id, user.id, e
                );
                false
            }
        }
    }

    async fn load_from_session(
        &self,
        session: &dyn SessionStore,
        user: &User,
        partition: &Partition,
    ) -> Option<PermissionSet> {
        let key = session_key(&user.id, partition);
        match session.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<PermissionSet>(&raw) {
                Ok(set) => {
                    debug!("Permission list for user {} loaded from session", user.id);
                    Some(set)
                }
                Err(e) => {
                    warn!("Discarding unreadable session value {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Session read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn store_in_session(
        &self,
        session: &dyn SessionStore,
        user: &User,
        partition: &Partition,
        set: &PermissionSet,
    ) {
        let key = session_key(&user.id, partition);
        let value = match serde_json::to_string(set) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not serialize permission list for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = session.set(&key, value).await {
            warn!("Session write failed for {}: {}", key, e);
        }
    }
}

/// Union of the groups' rule ids: trimmed, blanks dropped, first occurrence kept
fn collect_rule_ids(groups: &[Group]) -> Vec<RuleId> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .flat_map(|g| g.rule_ids.iter())
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_rule_ids() {
        let groups = vec![
            Group::new("g1", ["1", " 2", ""]),
            Group::new("g2", ["2", "3 ", "1"]),
        ];
        assert_eq!(collect_rule_ids(&groups), vec!["1", "2", "3"]);
        assert!(collect_rule_ids(&[]).is_empty());
    }
}
