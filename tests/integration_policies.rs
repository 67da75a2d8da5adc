mod common;

use axum::http::StatusCode;
use axum::{Router, middleware, routing};
use common::{TestApp, body_json, get, get_with_token};
use totoro::middleware::auth::auth_gate;
use totoro::middleware::policy::{Policy, RequireAdmin, RequireSubscriber, enforce};
use totoro_auth::Claims;
use totoro_core::Role;
use tower::ServiceExt;

async fn status_for(app: &TestApp, uri: &str, claims: Claims) -> StatusCode {
    let token = app.login(&claims);
    app.router()
        .oneshot(get_with_token(uri, &token))
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_min_role_family() {
    let app = TestApp::new();

    assert_eq!(
        status_for(&app, "/api/subscription", Claims::new(1, Role::User)).await,
        StatusCode::FORBIDDEN
    );
    for role in [Role::Family, Role::Admin, Role::Owner] {
        assert_eq!(
            status_for(&app, "/api/subscription", Claims::new(1, role)).await,
            StatusCode::OK,
            "{role} should reach the subscription route"
        );
    }
}

#[tokio::test]
async fn test_min_role_refuses_banned_and_unknown() {
    let app = TestApp::new();

    assert_eq!(
        status_for(&app, "/api/subscription", Claims::new(1, Role::Banned)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_for(
            &app,
            "/api/subscription",
            Claims::with_raw_role(1, Some("superuser"))
        )
        .await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_exact_admin_excludes_owner() {
    let app = TestApp::new();

    assert_eq!(
        status_for(&app, "/api/admin", Claims::new(1, Role::Admin)).await,
        StatusCode::OK
    );
    assert_eq!(
        status_for(&app, "/api/admin", Claims::new(1, Role::Owner)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_for(&app, "/api/admin", Claims::new(1, Role::Family)).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_owner_extractor() {
    let app = TestApp::new();

    assert_eq!(
        status_for(&app, "/api/owner", Claims::new(1, Role::Owner)).await,
        StatusCode::OK
    );
    assert_eq!(
        status_for(&app, "/api/owner", Claims::new(1, Role::Admin)).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_denial_message() {
    let app = TestApp::new();
    let token = app.login_as(1, Role::User);

    let response = app
        .router()
        .oneshot(get_with_token("/api/admin", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Forbidden: not allowed");
}

#[tokio::test]
async fn test_gate_failure_precedes_policy() {
    let app = TestApp::new();

    let response = app.router().oneshot(get("/api/admin")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_policy_without_gate_is_refused() {
    let app = TestApp::new();
    let chain = app.state.policies([Policy::MinRole(Role::User)]);

    let router: Router = Router::new()
        .route("/unguarded", routing::get(|| async { "reached" }))
        .route_layer(middleware::from_fn_with_state(chain, enforce));

    let response = router.oneshot(get("/unguarded")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"],
        "Unauthorized: user not initialized"
    );
}

#[tokio::test]
async fn test_chained_policies_all_apply() {
    let app = TestApp::new();
    let chain = app
        .state
        .policies([Policy::MinRole(Role::Family), Policy::ExactRole(Role::Owner)]);

    let router: Router = Router::new()
        .route("/owners", routing::get(|| async { "reached" }))
        .route_layer(middleware::from_fn_with_state(chain, enforce))
        .route_layer(middleware::from_fn_with_state(app.state.clone(), auth_gate));

    let family = app.login_as(1, Role::Family);
    let owner = app.login_as(2, Role::Owner);

    let response = router
        .clone()
        .oneshot(get_with_token("/owners", &family))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .oneshot(get_with_token("/owners", &owner))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn extractor_router(app: &TestApp) -> Router {
    Router::new()
        .route(
            "/premium",
            routing::get(|RequireSubscriber(user): RequireSubscriber| async move {
                user.user_id().to_string()
            }),
        )
        .route(
            "/staff",
            routing::get(|RequireAdmin(user): RequireAdmin| async move { user.user_id().to_string() }),
        )
        .route_layer(middleware::from_fn_with_state(app.state.clone(), auth_gate))
}

async fn extractor_status(app: &TestApp, uri: &str, role: Role) -> StatusCode {
    let token = app.login_as(3, role);
    extractor_router(app)
        .oneshot(get_with_token(uri, &token))
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_subscriber_extractor() {
    let app = TestApp::new();

    assert_eq!(
        extractor_status(&app, "/premium", Role::User).await,
        StatusCode::FORBIDDEN
    );
    for role in [Role::Family, Role::Admin, Role::Owner] {
        assert_eq!(
            extractor_status(&app, "/premium", role).await,
            StatusCode::OK,
            "{role} should pass the subscriber check"
        );
    }
}

#[tokio::test]
async fn test_admin_extractor_refuses_owner() {
    let app = TestApp::new();

    assert_eq!(
        extractor_status(&app, "/staff", Role::Admin).await,
        StatusCode::OK
    );
    assert_eq!(
        extractor_status(&app, "/staff", Role::Owner).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        extractor_status(&app, "/staff", Role::Family).await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_extractor_without_gate_is_refused() {
    let router: Router = Router::new().route(
        "/staff",
        routing::get(|RequireAdmin(_): RequireAdmin| async { "reached" }),
    );

    let response = router.oneshot(get("/staff")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
