//! Authorization policies.
//!
//! Policies run after the auth gate and are plain functions of the request's
//! identity context, headers and configuration:
//!
//! - [`Policy::MinRole`]: role score at least the threshold's score
//! - [`Policy::ExactRole`]: role equal to the required role (no inheritance:
//!   `ExactRole(Admin)` refuses owners)
//! - [`Policy::Internal`]: the `internal-header` header carries the
//!   pre-shared internal secret; needs no identity
//!
//! A [`PolicyChain`] applies its policies in order and stops at the first
//! failure. Handler-level checks are available as extractors
//! ([`RequireSubscriber`], [`RequireAdmin`], [`RequireOwner`]) and as the
//! [`check_min_role`] / [`check_role`] helpers.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use totoro_config::AuthConfig;
use totoro_core::{AuthError, Role};
use tracing::{error, warn};

use crate::metrics::{track_auth_failure, track_policy_denial};
use crate::middleware::auth::AuthUser;

/// Header carrying the internal secret on service-to-service calls.
pub const INTERNAL_HEADER: &str = "internal-header";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    MinRole(Role),
    ExactRole(Role),
    Internal,
}

impl Policy {
    /// Stable label, used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Policy::MinRole(_) => "min_role",
            Policy::ExactRole(_) => "exact_role",
            Policy::Internal => "internal",
        }
    }

    pub fn check(
        &self,
        user: Option<&AuthUser>,
        headers: &HeaderMap,
        config: &AuthConfig,
    ) -> Result<(), AuthError> {
        match self {
            Policy::MinRole(threshold) => check_min_role(require_context(user)?, *threshold),
            Policy::ExactRole(required) => check_role(require_context(user)?, *required),
            Policy::Internal => check_internal(headers, config),
        }
    }
}

fn require_context(user: Option<&AuthUser>) -> Result<&AuthUser, AuthError> {
    user.ok_or_else(|| {
        error!("Role policy evaluated without identity context; auth gate missing upstream");
        AuthError::ContextMissing
    })
}

/// Passes iff the user's role score is at least `threshold`'s.
///
/// Unknown roles score `0` and are refused by every threshold above `unverified`.
pub fn check_min_role(user: &AuthUser, threshold: Role) -> Result<(), AuthError> {
    if user.role_score() < threshold.score() {
        warn!(
            user = %user.user_id(),
            role = user.0.user_role.as_deref().unwrap_or("<none>"),
            minimum = %threshold,
            "Access denied: role below minimum"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(())
}

/// Passes iff the user's role is exactly `required`.
pub fn check_role(user: &AuthUser, required: Role) -> Result<(), AuthError> {
    if user.role() != Some(required) {
        warn!(
            user = %user.user_id(),
            role = user.0.user_role.as_deref().unwrap_or("<none>"),
            required = %required,
            "Access denied: role mismatch"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(())
}

/// Passes iff [`INTERNAL_HEADER`] equals the configured internal secret.
pub fn check_internal(headers: &HeaderMap, config: &AuthConfig) -> Result<(), AuthError> {
    let expected = config.internal_secret().map_err(|e| {
        error!(setting = e.setting(), "{}", e);
        AuthError::misconfigured(e.setting())
    })?;

    let presented = headers
        .get(INTERNAL_HEADER)
        .and_then(|value| value.to_str().ok());

    if !presented.is_some_and(|p| secrets_match(p, expected)) {
        warn!("Access denied: internal secret mismatch");
        return Err(AuthError::Forbidden);
    }

    Ok(())
}

/// Compares SHA-256 digests without early exit, so timing depends on
/// neither the secret's length nor the position of the first mismatch.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());

    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Ordered conjunction of policies, attached per route.
#[derive(Debug, Clone)]
pub struct PolicyChain {
    policies: Arc<[Policy]>,
    config: AuthConfig,
}

impl PolicyChain {
    pub fn new(config: AuthConfig, policies: impl IntoIterator<Item = Policy>) -> Self {
        Self {
            policies: policies.into_iter().collect(),
            config,
        }
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Applies every policy in order; the first failure wins.
    pub fn check(&self, user: Option<&AuthUser>, headers: &HeaderMap) -> Result<(), AuthError> {
        self.policies.iter().try_for_each(|policy| {
            policy
                .check(user, headers, &self.config)
                .inspect_err(|_| track_policy_denial(policy.label()))
        })
    }
}

/// Middleware running a [`PolicyChain`].
///
/// ```ignore
/// let admin_only = state.policies([Policy::ExactRole(Role::Admin)]);
/// router.route_layer(middleware::from_fn_with_state(admin_only, enforce))
/// ```
pub async fn enforce(
    State(chain): State<PolicyChain>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    chain
        .check(req.extensions().get::<AuthUser>(), req.headers())
        .inspect_err(|e| track_auth_failure(e.kind()))?;

    Ok(next.run(req).await)
}

/// Extractor for the subscribed tier and above (`family`, `admin`, `owner`).
///
/// ```rust,ignore
/// pub async fn premium(RequireSubscriber(user): RequireSubscriber) -> impl IntoResponse {
///     // user.role_score() >= Role::Family.score()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireSubscriber(pub AuthUser);

impl<S> FromRequestParts<S> for RequireSubscriber
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        check_min_role(&auth_user, Role::Family)?;

        Ok(RequireSubscriber(auth_user))
    }
}

/// Extractor for admins only. Owners are refused.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        check_role(&auth_user, Role::Admin)?;

        Ok(RequireAdmin(auth_user))
    }
}

#[derive(Debug, Clone)]
pub struct RequireOwner(pub AuthUser);

impl<S> FromRequestParts<S> for RequireOwner
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        check_role(&auth_user, Role::Owner)?;

        Ok(RequireOwner(auth_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use totoro_auth::Claims;

    fn user(role: Option<&str>) -> AuthUser {
        AuthUser(Claims::with_raw_role(1, role))
    }

    fn config() -> AuthConfig {
        AuthConfig {
            internal_secret: Some("s3cret".to_string()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_min_role_unknown_role_denied() {
        assert!(check_min_role(&user(Some("superuser")), Role::User).is_err());
        assert!(check_min_role(&user(None), Role::User).is_err());
        assert!(check_min_role(&user(None), Role::Unverified).is_ok());
    }

    #[test]
    fn test_chain_short_circuits_on_first_failure() {
        let chain = PolicyChain::new(
            config(),
            [Policy::Internal, Policy::MinRole(Role::Family)],
        );

        // Internal fails first, before the missing context is noticed.
        let result = chain.check(None, &HeaderMap::new());
        assert!(matches!(result, Err(AuthError::Forbidden)));

        let mut headers = HeaderMap::new();
        headers.insert(INTERNAL_HEADER, "s3cret".parse().unwrap());
        let result = chain.check(None, &headers);
        assert!(matches!(result, Err(AuthError::ContextMissing)));

        let family = user(Some("family"));
        assert!(chain.check(Some(&family), &headers).is_ok());
    }

    #[test]
    fn test_empty_chain_passes() {
        let chain = PolicyChain::new(config(), []);
        assert!(chain.check(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cre", "s3cret"));
        assert!(!secrets_match("s3cret-and-more", "s3cret"));
        assert!(!secrets_match("S3cret", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }

    #[test]
    fn test_internal_prefix_of_secret_is_refused() {
        let mut headers = HeaderMap::new();
        headers.insert(INTERNAL_HEADER, "s3c".parse().unwrap());
        assert!(matches!(
            check_internal(&headers, &config()),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn test_internal_without_configured_secret() {
        let result = check_internal(&HeaderMap::new(), &AuthConfig::default());
        assert!(matches!(result, Err(AuthError::Misconfigured { .. })));
    }
}
