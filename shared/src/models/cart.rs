//! Cart Model

use serde::{Deserialize, Serialize};

/// Cart line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Product reference (String ID)
    pub product_id: String,
    pub name: String,
    /// Unit price in currency unit
    pub price: f64,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
