//! Refund API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use shared::error::{AppError, AppResult};
use shared::models::{RefundProcess, RefundRequest, RefundRequestCreate, Role};

/// File a refund request against a paid order (buyer)
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<RefundRequestCreate>,
) -> AppResult<Json<RefundRequest>> {
    user.require_role(Role::Buyer)?;
    let request = state.refunds.request_refund(&user.id, payload)?;
    Ok(Json(request))
}

/// List every refund request (admin)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<RefundRequest>>> {
    user.require_admin()?;
    Ok(Json(state.refunds.list_all()?))
}

/// Get a refund request (owner or admin)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<RefundRequest>> {
    let request = state.refunds.get_request(&id)?;
    if request.buyer_id != user.id && !user.role.is_admin() {
        return Err(AppError::forbidden("You do not own this refund request"));
    }
    Ok(Json(request))
}

/// List all refund requests for an order (order owner or admin)
pub async fn list_for_order(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<Vec<RefundRequest>>> {
    let order = state.orders.get_order(&order_id)?;
    if order.buyer_id != user.id && !user.role.is_admin() {
        return Err(AppError::forbidden("You do not own this order"));
    }
    Ok(Json(state.refunds.list_for_order(&order_id)?))
}

/// Adjudicate a refund request (admin)
pub async fn process(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<RefundProcess>,
) -> AppResult<Json<RefundRequest>> {
    user.require_admin()?;
    let request = state.refunds.process_refund(&id, &user.id, payload)?;
    Ok(Json(request))
}

/// Add message request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMessageRequest {
    #[validate(length(min = 1))]
    pub message: String,
}

/// Append a message to the communication trail
pub async fn add_message(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AddMessageRequest>,
) -> AppResult<Json<RefundRequest>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let request = state
        .refunds
        .add_message(&id, &user.id, user.role, payload.message)?;
    Ok(Json(request))
}

/// Add evidence request
#[derive(Debug, Deserialize, Validate)]
pub struct AddEvidenceRequest {
    #[validate(length(min = 1))]
    pub files: Vec<String>,
}

/// Attach evidence files to a still-open request (buyer)
pub async fn add_evidence(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AddEvidenceRequest>,
) -> AppResult<Json<RefundRequest>> {
    user.require_role(Role::Buyer)?;
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let request = state.refunds.add_evidence(&id, &user.id, payload.files)?;
    Ok(Json(request))
}
