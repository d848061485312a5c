//! Delivery Model

use super::order::ShippingAddress;
use serde::{Deserialize, Serialize};

/// Delivery request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Accepted,
}

/// A physical delivery task awaiting a driver
///
/// Lives in the pending pool from order creation until a driver accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub delivery_id: String,
    /// Order that emitted this request
    pub order_id: String,
    pub buyer_id: String,
    pub farmer_id: String,
    /// Total shipment weight in kg, always positive
    pub weight: f64,
    pub pickup: ShippingAddress,
    pub dropoff: ShippingAddress,
    pub status: DeliveryStatus,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// Immutable record of a driver having taken on a delivery request
///
/// Created exactly once per accepted request; no re-assignment afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedDelivery {
    pub delivery_id: String,
    pub order_id: String,
    pub buyer_id: String,
    pub farmer_id: String,
    /// Accepting driver reference
    pub driver_id: String,
    pub weight: f64,
    pub pickup: ShippingAddress,
    pub dropoff: ShippingAddress,
    pub status: DeliveryStatus,
    /// Acceptance timestamp (Unix milliseconds)
    pub accepted_at: i64,
}

impl AcceptedDelivery {
    /// Snapshot a pending request for the accepting driver
    pub fn from_request(request: DeliveryRequest, driver_id: String, accepted_at: i64) -> Self {
        Self {
            delivery_id: request.delivery_id,
            order_id: request.order_id,
            buyer_id: request.buyer_id,
            farmer_id: request.farmer_id,
            driver_id,
            weight: request.weight,
            pickup: request.pickup,
            dropoff: request.dropoff,
            status: DeliveryStatus::Accepted,
            accepted_at,
        }
    }
}

/// Capacity admission decision with the load figures behind it
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Admission {
    pub admit: bool,
    /// Aggregate weight of the driver's accepted deliveries in kg
    pub current_load: f64,
    /// Weight of the request under consideration in kg
    pub candidate_weight: f64,
    /// current_load + candidate_weight
    pub proposed_load: f64,
    /// Static vehicle capacity of the driver in kg
    pub capacity: f64,
}
