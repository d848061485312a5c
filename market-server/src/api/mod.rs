//! HTTP API - routing and request handlers

pub mod deliveries;
pub mod orders;
pub mod refunds;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::ServerState;

/// Assemble the full API router
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(orders::router())
        .merge(deliveries::router())
        .merge(refunds::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
