//! Refund API Module

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Refund router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/refunds", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/process", put(handler::process))
        .route("/{id}/messages", post(handler::add_message))
        .route("/{id}/evidence", post(handler::add_evidence))
        .route("/order/{order_id}", get(handler::list_for_order))
}
