//! Capacity admission control
//!
//! Read-side aggregator over the materialized per-driver load counter. No
//! side effects; safe to call concurrently and repeatedly. Reads may be
//! slightly stale under concurrent acceptance, the write path re-runs the
//! same check inside its transaction before committing.

use crate::services::DriverDirectory;
use crate::storage::MarketStorage;
use shared::error::{AppError, AppResult};
use shared::models::Admission;

/// Decide admission for a candidate weight against a driver's load
///
/// The comparison is strict: a proposed load above capacity rejects, a
/// proposed load exactly at capacity is admitted.
pub fn admit(current_load: f64, candidate_weight: f64, capacity: f64) -> Admission {
    let proposed_load = current_load + candidate_weight;
    Admission {
        admit: proposed_load <= capacity,
        current_load,
        candidate_weight,
        proposed_load,
        capacity,
    }
}

#[derive(Clone)]
pub struct CapacityLedger {
    storage: MarketStorage,
    drivers: DriverDirectory,
}

impl CapacityLedger {
    pub fn new(storage: MarketStorage, drivers: DriverDirectory) -> Self {
        Self { storage, drivers }
    }

    /// Aggregate weight of the driver's accepted deliveries in kg
    pub fn current_load(&self, driver_id: &str) -> AppResult<f64> {
        self.storage
            .driver_load(driver_id)
            .map_err(|e| AppError::database(e.to_string()))
    }

    /// Report whether the driver could take on `candidate_weight` more kg
    pub fn can_admit(&self, driver_id: &str, candidate_weight: f64) -> AppResult<Admission> {
        let capacity = self.drivers.vehicle_capacity(driver_id)?;
        let current_load = self.current_load(driver_id)?;
        Ok(admit(current_load, candidate_weight, capacity))
    }
}
