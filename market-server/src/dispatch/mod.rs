//! Delivery dispatch module
//!
//! - **capacity**: read-side admission control over the driver load ledger
//! - **coordinator**: capacity-constrained acceptance of pending deliveries

pub mod capacity;
pub mod coordinator;

pub use capacity::CapacityLedger;
pub use coordinator::{AcceptanceReceipt, DispatchCoordinator};
