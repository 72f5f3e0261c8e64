//! Group and permission resolution
//!
//! [`GroupResolver`] turns a user into the active groups they belong to;
//! [`RuleResolver`] aggregates the groups' rule ids, evaluates rule
//! conditions and yields the user's [`PermissionSet`](crate::PermissionSet).
//! Both memoize into a shared [`ResolutionCache`](crate::cache::ResolutionCache).

pub mod groups;
pub mod rules;

pub use groups::GroupResolver;
pub use rules::RuleResolver;

use crate::error::{AuthError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run a store call, mapping an elapsed timeout to `StoreUnavailable`
pub(crate) async fn bounded<T, F>(timeout: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::StoreUnavailable(format!(
            "{} timed out after {}ms",
            what,
            timeout.as_millis()
        ))),
    };
    if let Err(e) = &result {
        warn!("{} failed: {}", what, e);
    }
    result
}
