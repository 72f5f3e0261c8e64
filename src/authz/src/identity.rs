//! Identity provider boundary

use crate::error::Result;
use crate::types::User;
use async_trait::async_trait;

/// Supplies the authenticated user for the current request
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current user, or `None` when the request is anonymous
    async fn current_user(&self) -> Result<Option<User>>;
}

/// Identity fixed at construction, e.g. a user already extracted from a
/// verified session or an upstream gateway header
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<User>,
}

impl StaticIdentity {
    /// Identity for an authenticated user
    pub fn new(user: User) -> Self {
        Self { user: Some(user) }
    }

    /// Anonymous identity
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl From<Option<User>> for StaticIdentity {
    fn from(user: Option<User>) -> Self {
        Self { user }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_identity() {
        let identity = StaticIdentity::new(User::new("7"));
        assert_eq!(identity.current_user().await.unwrap().unwrap().id, "7");

        let anonymous = StaticIdentity::anonymous();
        assert!(anonymous.current_user().await.unwrap().is_none());
    }
}
