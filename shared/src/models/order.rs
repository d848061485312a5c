//! Order Model

use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Cancelled and Refunded admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

/// Refund status mirrored onto the order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    #[default]
    None,
    Pending,
    Processing,
    Approved,
    Rejected,
}

/// Order line item - snapshot taken at order creation, never re-read
/// from the product catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Product reference (String ID)
    pub product_id: String,
    /// Selling farmer reference
    pub farmer_id: String,
    /// Name snapshot
    pub name: String,
    /// Unit price snapshot in currency unit
    pub price: f64,
    pub quantity: i32,
    /// Image snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Shipping address, also used as the delivery drop-off location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Opaque payment-provider result recorded on confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub update_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// Caller-supplied price breakdown
///
/// total must equal items + tax + shipping; validated at order creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceBreakdown {
    /// Items subtotal in currency unit
    pub items_price: f64,
    /// Tax amount in currency unit
    pub tax_price: f64,
    /// Shipping cost in currency unit
    pub shipping_price: f64,
    /// Grand total in currency unit
    pub total_price: f64,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Owning buyer reference
    pub buyer_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,

    /// Items subtotal in currency unit
    pub items_price: f64,
    /// Tax amount in currency unit
    pub tax_price: f64,
    /// Shipping cost in currency unit
    pub shipping_price: f64,
    /// Grand total in currency unit (items + tax + shipping)
    pub total_price: f64,

    pub status: OrderStatus,

    // === Payment facts ===
    pub is_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_result: Option<PaymentResult>,

    // === Delivery facts ===
    pub is_delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    /// Delivery request emitted at creation
    pub delivery_id: String,

    // === Cancellation facts ===
    pub is_cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,

    // === Refund facts ===
    pub refund_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_requested_at: Option<i64>,
    pub refund_status: RefundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_processed_at: Option<i64>,
    /// Bounded by total_price, 0 until a refund is approved
    #[serde(default)]
    pub refund_amount: f64,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(flatten)]
    pub prices: PriceBreakdown,
}
