//! Unified error codes for the marketplace
//!
//! This module defines all error codes used across the server and clients.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Order errors
//! - 4xxx: Delivery errors
//! - 5xxx: Refund errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 3xxx: Order ====================
    /// Order not found
    OrderNotFound = 3001,
    /// Order has already been paid
    OrderAlreadyPaid = 3002,
    /// Order has not been paid yet
    OrderNotPaid = 3003,
    /// Order has already been delivered
    OrderAlreadyDelivered = 3004,
    /// Order has been cancelled
    OrderCancelled = 3005,
    /// Order is in a terminal state
    OrderStateTerminal = 3006,
    /// Order has no items
    OrderEmpty = 3007,
    /// Order total does not match its price breakdown
    OrderTotalMismatch = 3008,
    /// Unknown order status value
    InvalidOrderStatus = 3009,

    // ==================== 4xxx: Delivery ====================
    /// Delivery request not found (or no longer pending)
    DeliveryNotFound = 4001,
    /// Driver not found
    DriverNotFound = 4002,
    /// Accepting would exceed the driver's vehicle capacity
    CapacityExceeded = 4003,
    /// Delivery weight must be positive
    InvalidWeight = 4004,

    // ==================== 5xxx: Refund ====================
    /// Refund request not found
    RefundNotFound = 5001,
    /// An active refund request already exists for this order
    RefundAlreadyRequested = 5002,
    /// Refund has not been requested for this order
    RefundNotRequested = 5003,
    /// Refund request has already been approved or rejected
    RefundAlreadyResolved = 5004,
    /// Refund amount exceeds the order total
    RefundAmountExceedsTotal = 5005,
    /// Unknown refund status value
    InvalidRefundStatus = 5006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",

            Self::NotAuthenticated => "Authentication required",
            Self::InvalidCredentials => "Invalid credentials",
            Self::TokenExpired => "Token expired",
            Self::TokenInvalid => "Invalid token",

            Self::PermissionDenied => "Permission denied",
            Self::RoleRequired => "Role required",
            Self::AdminRequired => "Admin role required",

            Self::OrderNotFound => "Order not found",
            Self::OrderAlreadyPaid => "Order has already been paid",
            Self::OrderNotPaid => "Order has not been paid",
            Self::OrderAlreadyDelivered => "Order has already been delivered",
            Self::OrderCancelled => "Order has been cancelled",
            Self::OrderStateTerminal => "Order is in a terminal state",
            Self::OrderEmpty => "Order has no items",
            Self::OrderTotalMismatch => "Order total does not match price breakdown",
            Self::InvalidOrderStatus => "Unknown order status",

            Self::DeliveryNotFound => "Delivery request not found",
            Self::DriverNotFound => "Driver not found",
            Self::CapacityExceeded => "Vehicle capacity exceeded",
            Self::InvalidWeight => "Delivery weight must be positive",

            Self::RefundNotFound => "Refund request not found",
            Self::RefundAlreadyRequested => "An active refund request already exists",
            Self::RefundNotRequested => "Refund has not been requested",
            Self::RefundAlreadyResolved => "Refund request has already been resolved",
            Self::RefundAmountExceedsTotal => "Refund amount exceeds order total",
            Self::InvalidRefundStatus => "Unknown refund status",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,

            1001 => Self::NotAuthenticated,
            1002 => Self::InvalidCredentials,
            1003 => Self::TokenExpired,
            1004 => Self::TokenInvalid,

            2001 => Self::PermissionDenied,
            2002 => Self::RoleRequired,
            2003 => Self::AdminRequired,

            3001 => Self::OrderNotFound,
            3002 => Self::OrderAlreadyPaid,
            3003 => Self::OrderNotPaid,
            3004 => Self::OrderAlreadyDelivered,
            3005 => Self::OrderCancelled,
            3006 => Self::OrderStateTerminal,
            3007 => Self::OrderEmpty,
            3008 => Self::OrderTotalMismatch,
            3009 => Self::InvalidOrderStatus,

            4001 => Self::DeliveryNotFound,
            4002 => Self::DriverNotFound,
            4003 => Self::CapacityExceeded,
            4004 => Self::InvalidWeight,

            5001 => Self::RefundNotFound,
            5002 => Self::RefundAlreadyRequested,
            5003 => Self::RefundNotRequested,
            5004 => Self::RefundAlreadyResolved,
            5005 => Self::RefundAmountExceedsTotal,
            5006 => Self::InvalidRefundStatus,

            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::ConfigError,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}
