//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderCreate, OrderStatus, PaymentResult, Role};

/// Create an order from the checkout payload
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<Order>> {
    user.require_role(Role::Buyer)?;
    let order = state.orders.create_order(&user.id, payload)?;
    Ok(Json(order))
}

/// List orders: admins see all, buyers their own
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    let orders = match user.role {
        Role::Admin => state.orders.list_all()?,
        Role::Buyer => state.orders.list_for_buyer(&user.id)?,
        _ => return Err(AppError::forbidden("Orders are visible to buyers and admins")),
    };
    Ok(Json(orders))
}

/// Get an order by id (owner or admin)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get_order(&id)?;
    if order.buyer_id != user.id && !user.role.is_admin() {
        return Err(AppError::forbidden("You do not own this order"));
    }
    Ok(Json(order))
}

/// Record a payment confirmation from the gateway
pub async fn pay(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<PaymentResult>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get_order(&id)?;
    if order.buyer_id != user.id && !user.role.is_admin() {
        return Err(AppError::forbidden("You do not own this order"));
    }
    let order = state.orders.mark_paid(&id, payload)?;
    Ok(Json(order))
}

/// Mark an order as delivered (admin or driver)
pub async fn deliver(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    if !matches!(user.role, Role::Admin | Role::Driver) {
        return Err(AppError::forbidden("Only drivers and admins mark deliveries"));
    }
    let order = state.orders.mark_delivered(&id)?;
    Ok(Json(order))
}

/// Set status request
#[derive(Debug, Deserialize, Validate)]
pub struct SetStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
    pub reason: Option<String>,
}

/// Set an order's lifecycle status (admin)
pub async fn set_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<SetStatusRequest>,
) -> AppResult<Json<Order>> {
    user.require_admin()?;
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let status = parse_status(&payload.status)?;
    let order = state.orders.set_status(&id, status, payload.reason)?;
    Ok(Json(order))
}

/// Parse a wire-format status name into [`OrderStatus`]
fn parse_status(value: &str) -> AppResult<OrderStatus> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|_| {
        AppError::with_message(
            ErrorCode::InvalidOrderStatus,
            format!("Unknown order status: {}", value),
        )
    })
}
