//! Collaborator services consumed by the fulfillment core
//!
//! - [`CartService`]: buyer carts (cleared on order creation / payment)
//! - [`DriverDirectory`]: driver profiles and vehicle capacities

pub mod cart;
pub mod drivers;

pub use cart::CartService;
pub use drivers::DriverDirectory;
