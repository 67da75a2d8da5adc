#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use totoro::router::init_router;
use totoro::state::AppState;
use totoro_auth::{Claims, encode_token};
use totoro_cache::{MemoryStore, SharedStore, StoreError};
use totoro_config::{AuthConfig, LockConfig};
use totoro_core::Role;

pub const COOKIE: &str = "totoro_session";
pub const SECRET: &str = "integration-test-secret";
pub const ALGORITHM: &str = "HS256";
pub const INTERNAL: &str = "internal-test-secret";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        cookie_name: Some(COOKIE.to_string()),
        secret: Some(SECRET.to_string()),
        algorithm: Some(ALGORITHM.to_string()),
        internal_secret: Some(INTERNAL.to_string()),
        require_verified: true,
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(auth_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config, &LockConfig::default());
        Self { store, state }
    }

    pub fn router(&self) -> Router {
        init_router(self.state.clone())
    }

    /// Mints a token and registers it as a live session.
    pub fn login(&self, claims: &Claims) -> String {
        let token = self.mint(claims);
        self.store.insert(token.clone(), "1");
        token
    }

    /// Mints a token without registering it.
    pub fn mint(&self, claims: &Claims) -> String {
        encode_token(claims, SECRET, ALGORITHM).unwrap()
    }

    pub fn login_as(&self, user: i64, role: Role) -> String {
        self.login(&Claims::new(user, role))
    }
}

/// Store whose every call fails, as an unreachable Redis would.
pub struct FailingStore;

#[async_trait]
impl SharedStore for FailingStore {
    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Other("connection refused".to_string()))
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
        Err(StoreError::Other("connection refused".to_string()))
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        Err(StoreError::Other("connection refused".to_string()))
    }

    async fn set_if_absent_with_expiry(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Other("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Other("connection refused".to_string()))
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("{COOKIE}={token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn post_verify(token: &str, internal_secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/internal/verify")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = internal_secret {
        builder = builder.header("internal-header", secret);
    }
    builder
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({ "token": token })).unwrap(),
        ))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
