//! The authentication gate.
//!
//! One pass per request, terminal on the first failure:
//!
//! 1. resolve cookie name, secret and algorithm (`Misconfigured`, 500)
//! 2. read the token from the cookie (`Unauthenticated`, 401)
//! 3. decode it with the pinned algorithm (`InvalidToken`, 401)
//! 4. check the token is still live in the shared store (`Revoked`, 401)
//! 5. when `require_verified` is set, refuse role-less or `unverified`
//!    users (`Unverified`, 403)
//! 6. attach [`AuthUser`] to the request
//!
//! Nothing is retried. The precise reason for a refused token is logged, the
//! client only sees the generic message.

use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use totoro_auth::{Claims, TokenCodec, UserId};
use totoro_cache::keys;
use totoro_config::ResolvedAuth;
use totoro_config::auth::{COOKIE_ALGORITHM, SECRET_KEY};
use totoro_core::{AuthError, Role};
use tracing::{debug, error, warn};

use crate::metrics::{record_session_lookup, track_auth_failure, track_auth_success};
use crate::state::AppState;

/// Identity of the authenticated caller, valid for one request.
///
/// Written once by [`auth_gate`]; read by policies and handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> &UserId {
        &self.0.user
    }

    /// Parsed role, `None` for missing or unknown values.
    pub fn role(&self) -> Option<Role> {
        self.0.role()
    }

    /// Role score; unknown roles score `0`.
    pub fn role_score(&self) -> i32 {
        self.0.role_score()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            error!(path = %parts.uri.path(), "Identity context missing; auth gate is not installed on this route");
            AuthError::ContextMissing
        })
    }
}

fn resolve_config(state: &AppState) -> Result<ResolvedAuth, AuthError> {
    state.auth_config.resolve().map_err(|e| {
        error!(setting = e.setting(), "{}", e);
        AuthError::misconfigured(e.setting())
    })
}

/// Reads the session token from the configured cookie.
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Runs the gate against request headers.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let config = resolve_config(state)?;

    let token = token_from_headers(headers, &config.cookie_name).ok_or_else(|| {
        debug!(cookie = %config.cookie_name, "No session cookie provided");
        AuthError::Unauthenticated
    })?;

    verify(state, &config, &token).await
}

/// Runs the gate against a token handed over directly, e.g. by another service.
pub async fn authenticate_token(state: &AppState, token: &str) -> Result<AuthUser, AuthError> {
    let config = resolve_config(state)?;

    if token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }

    verify(state, &config, token).await
}

async fn verify(state: &AppState, config: &ResolvedAuth, token: &str) -> Result<AuthUser, AuthError> {
    let codec = TokenCodec::new(&config.secret, &config.algorithm).map_err(|e| {
        error!(error = %e, "Signing configuration rejected");
        let setting = match e {
            totoro_auth::TokenError::InvalidKey => SECRET_KEY,
            _ => COOKIE_ALGORITHM,
        };
        AuthError::misconfigured(setting)
    })?;

    let claims = codec.decode(token).map_err(|e| {
        warn!(reason = e.kind(), "Session token rejected");
        AuthError::InvalidToken
    })?;

    let started = Instant::now();
    let lookup = state.store.exists(keys::session(token)).await;
    let outcome = match &lookup {
        Ok(true) => "live",
        Ok(false) => "absent",
        Err(_) => "error",
    };
    record_session_lookup(started.elapsed(), outcome);

    let live = lookup.map_err(|e| {
        error!(error = %e, "Session store unavailable");
        AuthError::store(e)
    })?;
    if !live {
        warn!(user = %claims.user, "Session token is not live in the store");
        return Err(AuthError::Revoked);
    }

    if state.auth_config.require_verified && is_unverified(&claims) {
        warn!(user = %claims.user, "Unverified user refused");
        return Err(AuthError::Unverified);
    }

    Ok(AuthUser(claims))
}

fn is_unverified(claims: &Claims) -> bool {
    match claims.user_role.as_deref() {
        None | Some("") => true,
        Some(role) => role == Role::Unverified.as_str(),
    }
}

/// Middleware installing the gate on a router.
///
/// ```ignore
/// router.route_layer(middleware::from_fn_with_state(state.clone(), auth_gate))
/// ```
pub async fn auth_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&state, req.headers())
        .await
        .inspect_err(|e| track_auth_failure(e.kind()))?;
    track_auth_success();

    req.extensions_mut().insert(user.clone());
    let mut response = next.run(req).await;

    // lets outer layers (request logging) see who was served
    response.extensions_mut().insert(user);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; session=abc.def.ghi".parse().unwrap());

        assert_eq!(
            token_from_headers(&headers, "session").as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(token_from_headers(&headers, "other"), None);
    }

    #[test]
    fn test_empty_cookie_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "session=".parse().unwrap());
        assert_eq!(token_from_headers(&headers, "session"), None);
    }

    #[test]
    fn test_is_unverified() {
        assert!(is_unverified(&Claims::with_raw_role(1, None)));
        assert!(is_unverified(&Claims::with_raw_role(1, Some(""))));
        assert!(is_unverified(&Claims::new(1, Role::Unverified)));
        assert!(!is_unverified(&Claims::new(1, Role::User)));
        assert!(!is_unverified(&Claims::new(1, Role::Banned)));
        assert!(!is_unverified(&Claims::with_raw_role(1, Some("custom"))));
    }

    #[test]
    fn test_auth_user_accessors() {
        let user = AuthUser(Claims::with_raw_role("u-1", Some("family")));
        assert_eq!(user.user_id().to_string(), "u-1");
        assert_eq!(user.role(), Some(Role::Family));
        assert_eq!(user.role_score(), 2);
    }
}
