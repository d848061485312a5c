//! Market Server - farm-to-table order fulfillment and dispatch core
//!
//! # Module structure
//!
//! ```text
//! market-server/src/
//! ├── core/       # Configuration, state, logging, bootstrap
//! ├── auth/       # JWT verification and the CurrentUser extractor
//! ├── storage/    # Transactional redb storage layer
//! ├── orders/     # Order lifecycle and money arithmetic
//! ├── dispatch/   # Capacity ledger and delivery acceptance
//! ├── refunds/    # Refund request workflow
//! ├── services/   # Cart and driver-profile collaborators
//! ├── api/        # HTTP routes and handlers
//! └── events.rs   # Domain event broadcast
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod dispatch;
pub mod events;
pub mod orders;
pub mod refunds;
pub mod services;
pub mod storage;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, ServerState};
pub use dispatch::{CapacityLedger, DispatchCoordinator};
pub use events::{DomainEvent, EventBus};
pub use orders::OrderLifecycle;
pub use refunds::RefundWorkflow;
pub use storage::MarketStorage;
