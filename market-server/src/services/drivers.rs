//! Driver directory
//!
//! In-memory registry of driver profiles. Vehicle capacity is a static
//! attribute of the profile; the dispatch core only reads it.

use dashmap::DashMap;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::DriverProfile;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct DriverDirectory {
    drivers: Arc<DashMap<String, DriverProfile>>,
}

impl DriverDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a driver profile
    pub fn register(&self, profile: DriverProfile) {
        self.drivers.insert(profile.id.clone(), profile);
    }

    /// Get a driver profile
    pub fn get(&self, driver_id: &str) -> Option<DriverProfile> {
        self.drivers.get(driver_id).map(|entry| entry.clone())
    }

    /// Get a driver's static vehicle capacity in kg
    pub fn vehicle_capacity(&self, driver_id: &str) -> AppResult<f64> {
        self.drivers
            .get(driver_id)
            .map(|entry| entry.vehicle_capacity)
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::DriverNotFound,
                    format!("Driver {} not found", driver_id),
                )
            })
    }
}
