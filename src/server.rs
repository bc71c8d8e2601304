//! Liveness endpoint for external uptime monitors.

use axum::{Router, routing::get};
use tracing::{error, info};

fn router() -> Router {
    Router::new()
        .route("/", get(|| async { "Bot is running!" }))
        .route("/health", get(|| async { "ok" }))
}

pub async fn run_with_listener(listener: tokio::net::TcpListener) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    info!("Liveness server listening on {}", addr);
    axum::serve(listener, router()).await
}

/// Bind `0.0.0.0:<port>` and serve in the background.
pub async fn spawn(port: u16) -> Result<std::net::SocketAddr, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    spawn_with_listener(listener)
}

pub fn spawn_with_listener(listener: tokio::net::TcpListener) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(listener).await {
            error!("liveness server failed: {err}");
        }
    });

    Ok(addr)
}
