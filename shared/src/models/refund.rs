//! Refund Model

use super::order::{OrderItem, RefundStatus};
use serde::{Deserialize, Serialize};

/// Refund request status
///
/// Pending → {Processing, Approved, Rejected}; Processing → {Approved, Rejected}.
/// Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundRequestStatus {
    #[default]
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl RefundRequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl From<RefundRequestStatus> for RefundStatus {
    fn from(status: RefundRequestStatus) -> Self {
        match status {
            RefundRequestStatus::Pending => Self::Pending,
            RefundRequestStatus::Processing => Self::Processing,
            RefundRequestStatus::Approved => Self::Approved,
            RefundRequestStatus::Rejected => Self::Rejected,
        }
    }
}

/// Who wrote a communication entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageSender {
    Customer,
    Admin,
}

/// Append-only communication entry, never rewritten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundMessage {
    pub message: String,
    pub sender: MessageSender,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// A buyer-initiated claim against a paid order, adjudicated by an admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub id: String,
    /// The one order this request refers to
    pub order_id: String,
    /// Requesting buyer reference
    pub buyer_id: String,
    pub reason: String,
    /// Item subset being refunded; defaults to the full order
    pub items: Vec<OrderItem>,
    pub status: RefundRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
    /// Adjudicating admin reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    /// Set only on approval; defaults to the order total if unspecified
    #[serde(default)]
    pub refund_amount: f64,
    /// Opaque file references
    pub evidence: Vec<String>,
    /// Append-only audit trail
    pub communication: Vec<RefundMessage>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// Create refund request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequestCreate {
    pub order_id: String,
    pub reason: String,
    #[serde(default)]
    pub items: Option<Vec<OrderItem>>,
    #[serde(default)]
    pub evidence: Option<Vec<String>>,
}

/// Admin adjudication payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundProcess {
    pub status: RefundRequestStatus,
    pub admin_notes: String,
    #[serde(default)]
    pub refund_amount: Option<f64>,
}
