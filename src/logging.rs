use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::middleware::auth::AuthUser;

/// Logs each request with a request id, and the served user when the auth
/// gate ran.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let request_id = uuid::Uuid::new_v4().to_string();

    info!(
        request_id = %request_id,
        method = %method,
        path = %matched_path,
        "Incoming request"
    );

    let response = next.run(req).await;
    let latency = start.elapsed();
    let status = response.status().as_u16();
    let user = response
        .extensions()
        .get::<AuthUser>()
        .map(|u| u.user_id().to_string())
        .unwrap_or_else(|| "-".to_string());

    match status {
        400..=499 => warn!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            user = %user,
            status,
            latency_ms = %latency.as_millis(),
            "Client error"
        ),
        500..=599 => error!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            user = %user,
            status,
            latency_ms = %latency.as_millis(),
            "Server error"
        ),
        _ => info!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            user = %user,
            status,
            latency_ms = %latency.as_millis(),
            "Request completed"
        ),
    }

    response
}

fn env_filter() -> EnvFilter {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "totoro={log_level},totoro_cache={log_level},totoro_cli={log_level},tower_http=warn,hyper=warn"
        ))
    })
}

/// Installs the global subscriber.
///
/// - `RUST_LOG` wins over `LOG_LEVEL` (default `info`)
/// - `LOG_FORMAT=json` switches the console to JSON lines
/// - `LOG_DIR` adds a daily-rolling JSON file; keep the returned guard alive
///   for the lifetime of the process or buffered lines are lost
pub fn init_tracing() -> anyhow::Result<Option<WorkerGuard>> {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let console_json = json.then(|| fmt::layer().json().with_current_span(true));
    let console_compact = (!json).then(|| {
        fmt::layer()
            .compact()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });

    let (file_layer, guard) = match std::env::var("LOG_DIR") {
        Ok(dir) if !dir.is_empty() => {
            std::fs::create_dir_all(&dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, &dir, "totoro.json");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_current_span(true);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(console_json)
        .with(console_compact)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
