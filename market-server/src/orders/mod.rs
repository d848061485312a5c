//! Order lifecycle module
//!
//! - **lifecycle**: order state machine and transactional creation flow
//! - **money**: decimal arithmetic and price-breakdown validation

pub mod lifecycle;
pub mod money;

pub use lifecycle::{OrderLifecycle, WEIGHT_PER_UNIT_KG};
