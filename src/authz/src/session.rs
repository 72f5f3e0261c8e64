//! Session-scoped storage for resolved permission lists
//!
//! In per-login mode the resolved list is written to the caller's session
//! under [`session_key`] and reused for the rest of that session.

use crate::error::Result;
use crate::types::Partition;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Key/value store scoped to one authenticated session
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove a value
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Session key under which a user's permission list is persisted
pub fn session_key(user_id: &str, partition: &Partition) -> String {
    format!("_auth_list_{}_{}", user_id, partition.key())
}

/// In-memory session store
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    values: Arc<DashMap<String, String>>,
}

impl InMemorySessionStore {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the session holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key() {
        assert_eq!(session_key("42", &Partition::default()), "_auth_list_42_1");
        assert_eq!(session_key("42", &Partition::new(vec![2, 1])), "_auth_list_42_1,2");
        assert_ne!(
            session_key("4", &Partition::new(vec![21])),
            session_key("42", &Partition::default())
        );
    }

    #[tokio::test]
    async fn test_in_memory_session() {
        let session = InMemorySessionStore::new();
        assert!(session.is_empty());

        session.set("k", "[\"a\"]".to_string()).await.unwrap();
        assert_eq!(session.get("k").await.unwrap().as_deref(), Some("[\"a\"]"));
        assert_eq!(session.len(), 1);

        session.remove("k").await.unwrap();
        assert!(session.get("k").await.unwrap().is_none());
    }
}
