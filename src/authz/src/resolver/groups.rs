//! User -> active groups

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::bounded;
use crate::cache::ResolutionCache;
use crate::error::Result;
use crate::store::RuleStore;
use crate::types::{Group, User};

/// Resolves the active groups of a user, memoized per user id
#[derive(Clone)]
pub struct GroupResolver {
    store: Arc<dyn RuleStore>,
    cache: ResolutionCache,
    timeout: Duration,
}

impl GroupResolver {
    /// Create a resolver over `store`, memoizing into `cache`
    pub fn new(store: Arc<dyn RuleStore>, cache: ResolutionCache, timeout: Duration) -> Self {
        Self {
            store,
            cache,
            timeout,
        }
    }

    /// Active groups of `user`; empty when the user has none
    ///
    /// # Errors
    ///
    /// Store failures and timeouts are returned as `StoreUnavailable`.
    pub async fn resolve_groups(&self, user: &User) -> Result<Arc<Vec<Group>>> {
        if let Some(groups) = self.cache.get_groups(&user.id) {
            debug!("Group cache hit for user {}", user.id);
            return Ok(groups);
        }

        let mut groups = bounded(
            self.timeout,
            "group lookup",
            self.store.groups_for_user(&user.id),
        )
        .await?;
        groups.retain(|g| g.active);

        debug!("Resolved {} groups for user {}", groups.len(), user.id);

        let groups = Arc::new(groups);
        self.cache.put_groups(&user.id, groups.clone());
        Ok(groups)
    }
}
