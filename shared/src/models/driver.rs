//! Driver Model

use serde::{Deserialize, Serialize};

/// Driver profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: String,
    pub name: String,
    /// Static vehicle capacity in kg
    pub vehicle_capacity: f64,
}
