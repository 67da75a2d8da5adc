use anyhow::Context;
use dotenvy::dotenv;
use totoro::logging::init_tracing;
use totoro::metrics::{init_metrics, metrics_app};
use totoro::router::init_router;
use totoro::state::init_app_state;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Held until shutdown so the file writer flushes.
    let _log_guard = init_tracing()?;

    let metrics_handle = init_metrics()?;

    let state = init_app_state().await?;
    let mut app = init_router(state);
    if let Some(handle) = metrics_handle {
        app = app.merge(metrics_app(handle));
        info!("Prometheus metrics exposed on /metrics");
    }

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    info!(addr = %bind_addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
