//! Delivery API Module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Delivery router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/deliveries", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/pending", get(handler::list_pending))
        .route("/accepted", get(handler::list_accepted))
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/admission", get(handler::can_accept))
}
