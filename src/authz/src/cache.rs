//! In-process resolution cache
//!
//! Memoizes group lists per user and permission sets per (user, partition).
//! Entries never expire; callers invalidate after changing groups or rules.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::permission::PermissionSet;
use crate::types::{Group, Partition, UserId};

/// Cache key for permission sets
type SetKey = (UserId, String);

/// Resolution cache shared by the group and rule resolvers
///
/// Backed by `DashMap`: reads are concurrent and writes lock only the
/// shard holding the key. Two tasks missing the same key may both compute
/// it; the later insert wins and both results are identical.
#[derive(Clone, Default)]
pub struct ResolutionCache {
    groups: Arc<DashMap<UserId, Arc<Vec<Group>>>>,
    permissions: Arc<DashMap<SetKey, Arc<PermissionSet>>>,
    stats: Arc<DashMap<&'static str, usize>>,
}

impl ResolutionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached groups for a user
    pub fn get_groups(&self, user_id: &str) -> Option<Arc<Vec<Group>>> {
        let hit = self.groups.get(user_id).map(|entry| entry.clone());
        self.record(hit.is_some());
        hit
    }

    /// Store groups for a user
    pub fn put_groups(&self, user_id: &str, groups: Arc<Vec<Group>>) {
        self.groups.insert(user_id.to_string(), groups);
    }

    /// Cached permission set for (user, partition)
    pub fn get_permissions(&self, user_id: &str, partition: &Partition) -> Option<Arc<PermissionSet>> {
        let key = (user_id.to_string(), partition.key());
        let hit = self.permissions.get(&key).map(|entry| entry.clone());
        self.record(hit.is_some());
        hit
    }

    /// Store a permission set for (user, partition)
    pub fn put_permissions(&self, user_id: &str, partition: &Partition, set: Arc<PermissionSet>) {
        self.permissions
            .insert((user_id.to_string(), partition.key()), set);
    }

    /// Drop every entry for one user
    pub fn invalidate_user(&self, user_id: &str) {
        self.groups.remove(user_id);
        self.permissions.retain(|(uid, _), _| uid != user_id);
        self.increment_stat("invalidations");
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.groups.clear();
        self.permissions.clear();
        self.stats.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            invalidations: self.get_stat("invalidations"),
            group_entries: self.groups.len(),
            permission_entries: self.permissions.len(),
        }
    }

    fn record(&self, hit: bool) {
        self.increment_stat(if hit { "hits" } else { "misses" });
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
    pub group_entries: usize,
    pub permission_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_creation() {
        let cache = ResolutionCache::new();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_permissions_keyed_by_partition() {
        let cache = ResolutionCache::new();
        let set = Arc::new(PermissionSet::new(["a"]));

        assert!(cache.get_permissions("u1", &Partition::default()).is_none());
        cache.put_permissions("u1", &Partition::default(), set.clone());

        assert_eq!(cache.get_permissions("u1", &Partition::default()), Some(set));
        assert!(cache.get_permissions("u1", &Partition::from(2)).is_none());
        assert!(cache.get_permissions("u2", &Partition::default()).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.hit_rate(), 0.25);
    }

    #[test]
    fn test_invalidate_user() {
        let cache = ResolutionCache::new();
        let set = Arc::new(PermissionSet::new(["a"]));

        cache.put_groups("u1", Arc::new(vec![Group::new("g", ["1"])]));
        cache.put_permissions("u1", &Partition::default(), set.clone());
        cache.put_permissions("u1", &Partition::from(2), set.clone());
        cache.put_permissions("u2", &Partition::default(), set);

        cache.invalidate_user("u1");

        let stats = cache.stats();
        assert_eq!(stats.group_entries, 0);
        assert_eq!(stats.permission_entries, 1);
        assert_eq!(stats.invalidations, 1);
        assert!(cache.get_permissions("u2", &Partition::default()).is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ResolutionCache::new();
        cache.put_groups("u1", Arc::new(Vec::new()));
        cache.put_permissions("u1", &Partition::default(), Arc::new(PermissionSet::empty()));

        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.group_entries, 0);
        assert_eq!(stats.permission_entries, 0);
    }
}
