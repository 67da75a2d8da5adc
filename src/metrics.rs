use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::middleware::auth::AuthUser;

const SESSION_LOOKUP_BUCKETS: &[f64] = &[0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5];

static METRICS_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if metrics are enabled via METRICS_ENABLED env var
pub fn is_metrics_enabled() -> bool {
    *METRICS_ENABLED.get_or_init(|| {
        std::env::var("METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true) // Enabled by default
    })
}

/// Initialize Prometheus metrics exporter with upkeep task
/// Returns None if metrics are disabled
pub fn init_metrics() -> anyhow::Result<Option<PrometheusHandle>> {
    if !is_metrics_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0,
            ],
        )?
        .set_buckets_for_metric(
            Matcher::Full("session_lookup_duration_seconds".to_string()),
            SESSION_LOOKUP_BUCKETS,
        )?
        .install_recorder()?;

    // Spawn upkeep task to clean stale metrics
    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Ok(Some(handle))
}

/// Role label for a served request, `anonymous` when the gate did not run.
fn role_label(response: &Response) -> &'static str {
    match response.extensions().get::<AuthUser>() {
        Some(user) => user.role().map_or("unknown", |role| role.as_str()),
        None => "anonymous",
    }
}

/// Tracks HTTP requests, labelled with the caller's role
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_metrics_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let uri_path = req.uri().path().to_owned();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or(uri_path);

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let role = role_label(&response);

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status, "role" => role).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router for metrics server
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

/// Count a refused request by failure kind (`unauthenticated`, `invalid_token`, ...).
pub fn track_auth_failure(kind: &'static str) {
    if !is_metrics_enabled() {
        return;
    }
    counter!("auth_failures_total", "kind" => kind).increment(1);
}

pub fn track_auth_success() {
    if !is_metrics_enabled() {
        return;
    }
    counter!("auth_success_total").increment(1);
}

/// Count a policy refusal by the policy that refused (`min_role`, `exact_role`, `internal`).
pub fn track_policy_denial(policy: &'static str) {
    if !is_metrics_enabled() {
        return;
    }
    counter!("policy_denials_total", "policy" => policy).increment(1);
}

/// Time spent asking the shared store whether a session is live.
pub fn record_session_lookup(elapsed: Duration, outcome: &'static str) {
    if !is_metrics_enabled() {
        return;
    }
    histogram!("session_lookup_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

/// Service-to-service token checks by outcome (`accepted` or an auth failure kind).
pub fn track_internal_verify(outcome: &'static str) {
    if !is_metrics_enabled() {
        return;
    }
    counter!("internal_verify_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_without_recorder_is_noop() {
        // No recorder installed: counters are discarded.
        track_auth_failure("invalid_token");
        track_auth_success();
        track_policy_denial("min_role");
        record_session_lookup(Duration::from_millis(2), "live");
        track_internal_verify("accepted");
    }

    #[test]
    fn test_role_label() {
        use totoro_auth::Claims;
        use totoro_core::Role;

        let mut response = Response::new(axum::body::Body::empty());
        assert_eq!(role_label(&response), "anonymous");

        response
            .extensions_mut()
            .insert(AuthUser(Claims::new(1, Role::Family)));
        assert_eq!(role_label(&response), "family");

        response
            .extensions_mut()
            .insert(AuthUser(Claims::with_raw_role(1, Some("superuser"))));
        assert_eq!(role_label(&response), "unknown");
    }
}
