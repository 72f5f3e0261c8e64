//! HTTP surface over an [`Authorizer`]
//!
//! - `POST /v1/check` - decide for a user carried in the body
//! - `POST /v1/cache/invalidate` - drop one user's cached entries, or all
//! - `GET /health` - liveness and cache statistics

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

use crate::cache::CacheStats;
use crate::engine::{AccessOutcome, Authorizer, Decision, RequestScope, Route};
use crate::error::AuthError;
use crate::identity::StaticIdentity;
use crate::matcher::{MatchMode, PermissionRequest, Relation, RequestParams};
use crate::types::{Partition, User};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(authorizer: Arc<Authorizer>) -> Self {
        Self {
            authorizer,
            start_time: Instant::now(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AuthError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AuthError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Requested names: a comma-separated string or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

/// Body of `POST /v1/check`
///
/// Exactly one of `permissions` and `route` must be given.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Authenticated user; absent means anonymous
    #[serde(default)]
    pub user: Option<User>,

    #[serde(default)]
    pub permissions: Option<Names>,

    #[serde(default)]
    pub route: Option<Route>,

    #[serde(default)]
    pub mode: MatchMode,

    #[serde(default)]
    pub relation: Relation,

    /// Current request parameters for url-constrained matching
    #[serde(default)]
    pub params: serde_json::Value,

    #[serde(default)]
    pub partition: Partition,
}

/// Body of `POST /v1/cache/invalidate`
#[derive(Debug, Default, Deserialize)]
pub struct InvalidateRequest {
    /// User to invalidate; all entries when absent
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub invalidated: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub cache: CacheStats,
}

/// POST /v1/check
async fn check_permissions(
    State(state): State<AppState>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(req) = body.map_err(|e| AuthError::InvalidInput(e.body_text()))?;
    let start = Instant::now();

    let user_id = req.user.as_ref().map(|u| u.id.clone());
    let identity = StaticIdentity::from(req.user);
    let scope = RequestScope::new(&identity)
        .with_params(RequestParams::from_json(req.params))
        .with_partition(req.partition);
    let authorizer = &state.authorizer;

    let (names, result) = match (req.permissions, req.route) {
        (Some(Names::One(names)), None) => {
            let normalized = PermissionRequest::parse(&names).names().to_vec();
            let result = authorizer
                .check_string(&scope, &names, req.mode, req.relation)
                .await;
            (normalized, result)
        }
        (Some(Names::Many(names)), None) => {
            let request = PermissionRequest::from_names(&names)
                .with_mode(req.mode)
                .with_relation(req.relation);
            let result = authorizer.check(&scope, &request).await;
            (request.names().to_vec(), result)
        }
        (None, Some(route)) => {
            let result = authorizer
                .check_action(&scope, &route, req.mode, req.relation)
                .await;
            (vec![route.permission_name()], result)
        }
        _ => {
            return Err(AuthError::InvalidInput(
                "exactly one of `permissions` or `route` is required".into(),
            ))
        }
    };

    let result = match result {
        Err(e) if !e.is_unavailable() => return Err(e),
        other => other,
    };

    let decision = Decision::new(
        user_id,
        names,
        &result,
        start.elapsed().as_micros() as u64,
    );

    info!(
        "Decision {}: {:?} for user {:?} on {:?}",
        decision.decision_id, decision.outcome, decision.user_id, decision.permissions
    );

    let status = match decision.outcome {
        AccessOutcome::Granted => StatusCode::OK,
        AccessOutcome::Denied => StatusCode::FORBIDDEN,
        AccessOutcome::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };

    Ok((status, Json(decision)).into_response())
}

/// POST /v1/cache/invalidate
async fn invalidate_cache(
    State(state): State<AppState>,
    body: Result<Json<InvalidateRequest>, JsonRejection>,
) -> Result<Json<InvalidateResponse>, AuthError> {
    let Json(req) = body.map_err(|e| AuthError::InvalidInput(e.body_text()))?;

    let invalidated = match req.user_id {
        Some(user_id) => {
            state.authorizer.invalidate_user(&user_id);
            user_id
        }
        None => {
            state.authorizer.clear_cache();
            "all".to_string()
        }
    };

    Ok(Json(InvalidateResponse { invalidated }))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: crate::VERSION.to_string(),
        cache: state.authorizer.cache_stats(),
    })
}

/// Build the HTTP router with tracing and CORS layers
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/v1/check", post(check_permissions))
        .route("/v1/cache/invalidate", post(invalidate_cache))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
        .with_state(state)
}
