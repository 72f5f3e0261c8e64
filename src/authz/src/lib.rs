//! # group-auth
//!
//! Group/rule authorization for guarded request handlers.
//!
//! A user belongs to groups; each group grants a list of rule ids; each
//! rule carries a permission name and an optional condition over the
//! user's attributes. A check resolves the user's permission names and
//! matches the requested names against them.
//!
//! ## Features
//!
//! - **Async store boundary** (`RuleStore`) with in-memory and PostgreSQL
//!   (feature `postgres`) backends
//! - **Restricted condition language** over `{attribute}` placeholders,
//!   compiled once per expression
//! - **Url-constrained names** such as `order_edit?status=1`, matched
//!   against the current request's parameters
//! - **Two-tier memoization**: an in-process `ResolutionCache` and an
//!   optional per-login session tier
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use group_auth::{
//!     AuthConfig, Authorizer, Group, InMemoryRuleStore, MatchMode, Relation, RequestScope,
//!     Rule, StaticIdentity, User,
//! };
//!
//! #[tokio::main]
//! async fn main() -> group_auth::Result<()> {
//!     let store = Arc::new(InMemoryRuleStore::new());
//!     store.put_rule(Rule::new("1", "order_edit")).await;
//!     store.put_group(Group::new("editors", ["1"])).await;
//!     store.add_member("alice", "editors").await;
//!
//!     let authorizer = Authorizer::new(AuthConfig::default(), store);
//!     let identity = StaticIdentity::new(User::new("alice"));
//!     let scope = RequestScope::new(&identity);
//!
//!     let allowed = authorizer
//!         .check_string(&scope, "Order_Edit", MatchMode::Url, Relation::Any)
//!         .await?;
//!     assert!(allowed);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod condition; // Restricted rule-condition language
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod matcher;
pub mod permission;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use cache::{CacheStats, ResolutionCache};
pub use config::{AuthConfig, AuthMode, IgnoreLists, TableNames};
pub use engine::{AccessOutcome, Authorizer, Decision, RequestScope, Route};
pub use error::{AuthError, Result};
pub use identity::{IdentityProvider, StaticIdentity};
pub use matcher::{decide, MatchMode, PermissionRequest, Relation, RequestParams};
pub use permission::{PermissionSet, QualifiedName};
pub use resolver::{GroupResolver, RuleResolver};
pub use session::{session_key, InMemorySessionStore, SessionStore};
pub use store::{InMemoryRuleStore, RuleFixture, RuleStore};
#[cfg(feature = "postgres")]
pub use store::PostgresRuleStore;
pub use types::{Group, Partition, Rule, User};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
