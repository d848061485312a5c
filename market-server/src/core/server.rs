//! HTTP server bootstrap

use crate::api;
use crate::core::ServerState;
use anyhow::Context;

/// Bind the configured port and serve the API until shutdown
pub async fn serve(state: ServerState) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        environment = %state.config.environment,
        "market server listening"
    );

    let router = api::router().with_state(state);
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
