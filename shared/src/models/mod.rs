//! Domain models for the marketplace

pub mod cart;
pub mod delivery;
pub mod driver;
pub mod order;
pub mod refund;
pub mod role;

pub use cart::CartItem;
pub use delivery::{AcceptedDelivery, Admission, DeliveryRequest, DeliveryStatus};
pub use driver::DriverProfile;
pub use order::{
    Order, OrderCreate, OrderItem, OrderStatus, PaymentResult, PriceBreakdown, RefundStatus,
    ShippingAddress,
};
pub use refund::{
    MessageSender, RefundMessage, RefundProcess, RefundRequest, RefundRequestCreate,
    RefundRequestStatus,
};
pub use role::Role;
