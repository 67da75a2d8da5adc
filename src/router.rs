use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use totoro_auth::UserId;
use totoro_core::{AuthError, Role};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::logging::logging_middleware;
use crate::metrics::{metrics_middleware, track_internal_verify};
use crate::middleware::auth::{AuthUser, auth_gate, authenticate_token};
use crate::middleware::policy::{Policy, RequireOwner, enforce};
use crate::state::AppState;

/// Identity as returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub user: UserId,
    pub user_role: Option<String>,
    pub role_score: i32,
}

impl From<&AuthUser> for IdentityResponse {
    fn from(user: &AuthUser) -> Self {
        Self {
            user: user.user_id().clone(),
            user_role: user.0.user_role.clone(),
            role_score: user.role_score(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn me(user: AuthUser) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(&user))
}

async fn subscription(user: AuthUser) -> Json<Value> {
    Json(json!({ "user": user.user_id(), "tier": "subscriber" }))
}

async fn admin_only(user: AuthUser) -> Json<Value> {
    Json(json!({ "user": user.user_id(), "scope": "admin" }))
}

async fn owner(RequireOwner(user): RequireOwner) -> Json<Value> {
    Json(json!({ "user": user.user_id(), "scope": "owner" }))
}

/// Validates a token handed over by another service.
async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<IdentityResponse>, AuthError> {
    let user = authenticate_token(&state, &body.token)
        .await
        .inspect_err(|e| track_internal_verify(e.kind()))?;
    track_internal_verify("accepted");

    Ok(Json(IdentityResponse::from(&user)))
}

pub fn init_router(state: AppState) -> Router {
    let subscribers = state.policies([Policy::MinRole(Role::Family)]);
    let admins = state.policies([Policy::ExactRole(Role::Admin)]);
    let internal = state.policies([Policy::Internal]);

    let api = Router::new()
        .route("/me", get(me))
        .route("/owner", get(owner))
        .merge(
            Router::new()
                .route("/subscription", get(subscription))
                .route_layer(middleware::from_fn_with_state(subscribers, enforce)),
        )
        .merge(
            Router::new()
                .route("/admin", get(admin_only))
                .route_layer(middleware::from_fn_with_state(admins, enforce)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_gate));

    let internal_routes = Router::new()
        .route("/verify", post(verify))
        .route_layer(middleware::from_fn_with_state(internal, enforce));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest("/internal", internal_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(logging_middleware))
                .layer(middleware::from_fn(metrics_middleware)),
        )
}
