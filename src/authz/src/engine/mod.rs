//! Authorizer: the entry point guarded request handlers call
//!
//! ```text
//! identity -> enable flag -> RuleResolver -> decide()
//!                               |
//!                        [ResolutionCache]  [SessionStore]
//! ```

pub mod decision;

pub use decision::{AccessOutcome, Decision};

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CacheStats, ResolutionCache};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::identity::IdentityProvider;
use crate::matcher::{decide, MatchMode, PermissionRequest, Relation, RequestParams};
use crate::permission::PermissionSet;
use crate::resolver::RuleResolver;
use crate::session::SessionStore;
use crate::store::RuleStore;
use crate::types::{Partition, User};

/// Everything a check needs from the current request
pub struct RequestScope<'a> {
    identity: &'a dyn IdentityProvider,
    session: Option<&'a dyn SessionStore>,
    params: RequestParams,
    partition: Partition,
}

impl<'a> RequestScope<'a> {
    /// Scope with no session, no parameters and the default partition
    pub fn new(identity: &'a dyn IdentityProvider) -> Self {
        Self {
            identity,
            session: None,
            params: RequestParams::new(),
            partition: Partition::default(),
        }
    }

    pub fn with_session(mut self, session: &'a dyn SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_params(mut self, params: RequestParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_partition(mut self, partition: impl Into<Partition>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }
}

/// Controller/action pair of the handler being guarded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub controller: String,
    pub action: String,
}

impl Route {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// Permission name for this route: `controller_action`, lower-cased
    pub fn permission_name(&self) -> String {
        format!(
            "{}_{}",
            self.controller.to_lowercase(),
            self.action.to_lowercase()
        )
    }
}

impl FromStr for Route {
    type Err = AuthError;

    /// Parse `controller/action`
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((controller, action)) if !controller.is_empty() && !action.is_empty() => {
                Ok(Route::new(controller, action))
            }
            _ => Err(AuthError::InvalidInput(format!(
                "Route must be controller/action, got '{}'",
                s
            ))),
        }
    }
}

/// Shared authorization component
///
/// Construct once and share through `Arc`. The resolution cache lives here
/// and is reused by every check.
pub struct Authorizer {
    config: AuthConfig,
    resolver: RuleResolver,
    cache: ResolutionCache,
}

impl Authorizer {
    /// Create an authorizer over `store`
    pub fn new(config: AuthConfig, store: Arc<dyn RuleStore>) -> Self {
        let cache = ResolutionCache::new();
        let resolver = RuleResolver::new(store, cache.clone(), &config);

        info!(
            "Authorizer initialized: enabled={}, mode={:?}, store_timeout={}ms",
            config.enabled, config.mode, config.store_timeout_ms
        );

        Self {
            config,
            resolver,
            cache,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn resolver(&self) -> &RuleResolver {
        &self.resolver
    }

    /// Check `request` against the current user's permissions
    ///
    /// No identified user is a denial and touches no store. With checking
    /// disabled, an identified user is always granted.
    pub async fn check(&self, scope: &RequestScope<'_>, request: &PermissionRequest) -> Result<bool> {
        let Some(user) = scope.identity.current_user().await? else {
            debug!("No identified user, denying {:?}", request.names());
            return Ok(false);
        };

        if !self.config.enabled {
            return Ok(true);
        }

        let permissions = self.permissions_for(scope, &user).await?;
        let allowed = decide(&permissions, request, &scope.params);

        debug!(
            "User {} {} for {:?} ({:?}, {:?})",
            user.id,
            if allowed { "granted" } else { "denied" },
            request.names(),
            request.mode,
            request.relation
        );

        Ok(allowed)
    }

    /// Check a permission string; comma-separated names are split
    ///
    /// Strings on the `ignore.string` list pass without a check.
    pub async fn check_string(
        &self,
        scope: &RequestScope<'_>,
        names: &str,
        mode: MatchMode,
        relation: Relation,
    ) -> Result<bool> {
        if self.config.ignore.ignores_string(names) {
            debug!("'{}' is on the ignore list", names);
            return Ok(true);
        }

        let request = PermissionRequest::parse(names)
            .with_mode(mode)
            .with_relation(relation);
        self.check(scope, &request).await
    }

    /// Check the permission named after a controller/action route
    ///
    /// Ignored controllers and ignored `controller_action` names pass
    /// without a check.
    pub async fn check_action(
        &self,
        scope: &RequestScope<'_>,
        route: &Route,
        mode: MatchMode,
        relation: Relation,
    ) -> Result<bool> {
        if self.config.ignore.ignores_controller(&route.controller) {
            debug!("Controller '{}' is on the ignore list", route.controller);
            return Ok(true);
        }

        let name = route.permission_name();
        if self.config.ignore.ignores_action(&name) {
            debug!("Action '{}' is on the ignore list", name);
            return Ok(true);
        }

        let request = PermissionRequest::from_names([name])
            .with_mode(mode)
            .with_relation(relation);
        self.check(scope, &request).await
    }

    /// Map a check result onto a three-way outcome
    pub fn outcome(result: &Result<bool>) -> AccessOutcome {
        AccessOutcome::from_result(result)
    }

    /// Resolved permission set of the current user, `None` when nobody is
    /// identified
    pub async fn permissions(&self, scope: &RequestScope<'_>) -> Result<Option<Arc<PermissionSet>>> {
        match scope.identity.current_user().await? {
            Some(user) => Ok(Some(self.permissions_for(scope, &user).await?)),
            None => Ok(None),
        }
    }

    /// Drop cached groups and permission sets of one user
    pub fn invalidate_user(&self, user_id: &str) {
        info!("Invalidating cached permissions for user {}", user_id);
        self.cache.invalidate_user(user_id);
    }

    /// Drop every cached entry, including compiled conditions
    pub fn clear_cache(&self) {
        info!("Clearing resolution cache");
        self.cache.clear();
        self.resolver.conditions().clear_cache();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn permissions_for(&self, scope: &RequestScope<'_>, user: &User) -> Result<Arc<PermissionSet>> {
        self.resolver
            .resolve_permissions(user, &scope.partition, scope.session)
            .await
    }
}
