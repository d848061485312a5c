//! Delivery API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::dispatch::AcceptanceReceipt;
use shared::error::{AppError, AppResult};
use shared::models::{AcceptedDelivery, Admission, DeliveryRequest, Role};

/// List pending delivery requests (role-scoped visibility)
pub async fn list_pending(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<DeliveryRequest>>> {
    let pending = state.dispatch.list_pending(user.role, &user.id)?;
    Ok(Json(pending))
}

/// Accept a pending delivery request (driver)
pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AcceptanceReceipt>> {
    if user.role != Role::Driver {
        return Err(AppError::forbidden("Only drivers accept deliveries"));
    }
    let receipt = state.dispatch.accept_delivery(&user.id, &id)?;
    Ok(Json(receipt))
}

/// List the calling driver's accepted deliveries
pub async fn list_accepted(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<AcceptedDelivery>>> {
    if user.role != Role::Driver {
        return Err(AppError::forbidden("Only drivers have accepted deliveries"));
    }
    let accepted = state.dispatch.list_accepted(&user.id)?;
    Ok(Json(accepted))
}

/// Preview whether the calling driver could take on a given weight
pub async fn can_accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Admission>> {
    if user.role != Role::Driver {
        return Err(AppError::forbidden("Only drivers accept deliveries"));
    }
    let pending = state.dispatch.list_pending(Role::Driver, &user.id)?;
    let request = pending
        .into_iter()
        .find(|r| r.delivery_id == id)
        .ok_or_else(|| {
            AppError::with_message(
                shared::error::ErrorCode::DeliveryNotFound,
                format!("Delivery request {} not found or already accepted", id),
            )
        })?;
    let admission = state.capacity.can_admit(&user.id, request.weight)?;
    Ok(Json(admission))
}
