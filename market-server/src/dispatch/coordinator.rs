//! Dispatch coordinator - capacity-constrained delivery acceptance
//!
//! # Acceptance Flow
//!
//! ```text
//! accept_delivery(driver_id, delivery_id)
//!     ├─ 1. Look up driver capacity
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Re-read pending request (first-accept-wins)
//!     ├─ 4. Re-read load counter and run admission
//!     ├─ 5. Store accepted snapshot + bump load + remove from pool
//!     ├─ 6. Commit transaction
//!     └─ 7. Publish DeliveryAccepted
//! ```
//!
//! redb admits one write transaction at a time, so two drivers racing for
//! the same delivery serialize at step 2: the loser re-reads at step 3 and
//! finds the pool entry gone. The same serialization makes the load check at
//! step 4 authoritative; a rejected admission drops the transaction and the
//! request stays pending.

use crate::dispatch::capacity;
use crate::events::{DomainEvent, EventBus};
use crate::services::DriverDirectory;
use crate::storage::MarketStorage;
use chrono::Utc;
use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{AcceptedDelivery, DeliveryRequest, Role};

/// Result of a successful acceptance: the snapshot plus updated load figures
#[derive(Debug, Clone, Serialize)]
pub struct AcceptanceReceipt {
    pub delivery: AcceptedDelivery,
    /// Driver's committed load after this acceptance, in kg
    pub current_load: f64,
    pub capacity: f64,
}

#[derive(Clone)]
pub struct DispatchCoordinator {
    storage: MarketStorage,
    drivers: DriverDirectory,
    events: EventBus,
}

impl DispatchCoordinator {
    pub fn new(storage: MarketStorage, drivers: DriverDirectory, events: EventBus) -> Self {
        Self {
            storage,
            drivers,
            events,
        }
    }

    /// Accept a pending delivery request on behalf of a driver
    ///
    /// Fails with `DeliveryNotFound` if the request is absent or already
    /// accepted, and with `CapacityExceeded` (carrying the load figures) if
    /// admission is denied; in the latter case the request remains pending
    /// and may be retried by this or another driver.
    pub fn accept_delivery(&self, driver_id: &str, delivery_id: &str) -> AppResult<AcceptanceReceipt> {
        let capacity = self.drivers.vehicle_capacity(driver_id)?;

        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let request = self
            .storage
            .get_pending_delivery_txn(&txn, delivery_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::DeliveryNotFound,
                    format!("Delivery request {} not found or already accepted", delivery_id),
                )
            })?;

        let current_load = self
            .storage
            .driver_load_txn(&txn, driver_id)
            .map_err(|e| AppError::database(e.to_string()))?;

        let admission = capacity::admit(current_load, request.weight, capacity);
        if !admission.admit {
            // Transaction dropped without commit; the request stays pending
            return Err(AppError::with_message(
                ErrorCode::CapacityExceeded,
                format!(
                    "Accepting delivery {} would load driver {} to {:.1} kg over a {:.1} kg capacity",
                    delivery_id, driver_id, admission.proposed_load, admission.capacity
                ),
            )
            .with_detail("current_load", admission.current_load)
            .with_detail("candidate_weight", admission.candidate_weight)
            .with_detail("proposed_load", admission.proposed_load)
            .with_detail("capacity", admission.capacity));
        }

        let accepted = AcceptedDelivery::from_request(
            request,
            driver_id.to_string(),
            Utc::now().timestamp_millis(),
        );

        self.storage
            .store_accepted_delivery(&txn, &accepted)
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .set_driver_load(&txn, driver_id, admission.proposed_load)
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .remove_pending_delivery(&txn, delivery_id)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        self.events.publish(DomainEvent::DeliveryAccepted {
            delivery_id: accepted.delivery_id.clone(),
            order_id: accepted.order_id.clone(),
            driver_id: driver_id.to_string(),
            weight: accepted.weight,
        });

        Ok(AcceptanceReceipt {
            delivery: accepted,
            current_load: admission.proposed_load,
            capacity,
        })
    }

    /// List pending delivery requests with role-scoped visibility
    ///
    /// Drivers and admins see the whole pool; buyers only requests for their
    /// own orders; farmers only requests referencing their own produce.
    pub fn list_pending(&self, role: Role, requester_id: &str) -> AppResult<Vec<DeliveryRequest>> {
        let pending = self
            .storage
            .list_pending_deliveries()
            .map_err(|e| AppError::database(e.to_string()))?;

        let pending = match role {
            Role::Driver | Role::Admin => pending,
            Role::Buyer => pending
                .into_iter()
                .filter(|r| r.buyer_id == requester_id)
                .collect(),
            Role::Farmer => pending
                .into_iter()
                .filter(|r| r.farmer_id == requester_id)
                .collect(),
        };
        Ok(pending)
    }

    /// List a driver's accepted deliveries
    pub fn list_accepted(&self, driver_id: &str) -> AppResult<Vec<AcceptedDelivery>> {
        self.storage
            .list_accepted_for_driver(driver_id)
            .map_err(|e| AppError::database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DeliveryStatus, DriverProfile, ShippingAddress};

    fn test_coordinator() -> (DispatchCoordinator, MarketStorage, DriverDirectory) {
        let storage = MarketStorage::open_in_memory().unwrap();
        let drivers = DriverDirectory::new();
        let coordinator =
            DispatchCoordinator::new(storage.clone(), drivers.clone(), EventBus::new());
        (coordinator, storage, drivers)
    }

    fn register_driver(drivers: &DriverDirectory, id: &str, capacity: f64) {
        drivers.register(DriverProfile {
            id: id.to_string(),
            name: format!("Driver {}", id),
            vehicle_capacity: capacity,
        });
    }

    fn seed_request(storage: &MarketStorage, delivery_id: &str, buyer: &str, weight: f64) {
        let request = DeliveryRequest {
            delivery_id: delivery_id.to_string(),
            order_id: format!("order-{}", delivery_id),
            buyer_id: buyer.to_string(),
            farmer_id: "farmer-1".to_string(),
            weight,
            pickup: ShippingAddress::default(),
            dropoff: ShippingAddress::default(),
            status: DeliveryStatus::Pending,
            created_at: 1_700_000_000_000,
        };
        let txn = storage.begin_write().unwrap();
        storage.store_pending_delivery(&txn, &request).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn test_accept_moves_request_out_of_pool() {
        let (coordinator, storage, drivers) = test_coordinator();
        register_driver(&drivers, "driver-1", 500.0);
        seed_request(&storage, "dlv-1", "buyer-1", 60.0);

        let receipt = coordinator.accept_delivery("driver-1", "dlv-1").unwrap();
        assert_eq!(receipt.delivery.driver_id, "driver-1");
        assert_eq!(receipt.delivery.status, DeliveryStatus::Accepted);
        assert_eq!(receipt.current_load, 60.0);
        assert_eq!(receipt.capacity, 500.0);

        assert!(storage.list_pending_deliveries().unwrap().is_empty());
        assert_eq!(coordinator.list_accepted("driver-1").unwrap().len(), 1);
        assert_eq!(storage.driver_load("driver-1").unwrap(), 60.0);
    }

    #[test]
    fn test_second_accept_fails_first_wins() {
        let (coordinator, storage, drivers) = test_coordinator();
        register_driver(&drivers, "driver-1", 500.0);
        register_driver(&drivers, "driver-2", 500.0);
        seed_request(&storage, "dlv-1", "buyer-1", 60.0);

        coordinator.accept_delivery("driver-1", "dlv-1").unwrap();
        let err = coordinator.accept_delivery("driver-2", "dlv-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::DeliveryNotFound);
    }

    #[test]
    fn test_capacity_rejection_carries_figures_and_keeps_request() {
        let (coordinator, storage, drivers) = test_coordinator();
        register_driver(&drivers, "driver-1", 500.0);
        seed_request(&storage, "dlv-load", "buyer-1", 450.0);
        seed_request(&storage, "dlv-over", "buyer-1", 60.0);

        coordinator.accept_delivery("driver-1", "dlv-load").unwrap();

        let err = coordinator.accept_delivery("driver-1", "dlv-over").unwrap_err();
        assert_eq!(err.code, ErrorCode::CapacityExceeded);
        let details = err.details.unwrap();
        assert_eq!(details.get("current_load").unwrap(), 450.0);
        assert_eq!(details.get("candidate_weight").unwrap(), 60.0);
        assert_eq!(details.get("proposed_load").unwrap(), 510.0);
        assert_eq!(details.get("capacity").unwrap(), 500.0);

        // The rejected request is still pending and another driver can take it
        let pending = storage.list_pending_deliveries().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].delivery_id, "dlv-over");
        assert_eq!(pending[0].status, DeliveryStatus::Pending);

        register_driver(&drivers, "driver-2", 100.0);
        assert!(coordinator.accept_delivery("driver-2", "dlv-over").is_ok());
    }

    #[test]
    fn test_accept_exactly_at_capacity() {
        let (coordinator, storage, drivers) = test_coordinator();
        register_driver(&drivers, "driver-1", 100.0);
        seed_request(&storage, "dlv-1", "buyer-1", 100.0);

        let receipt = coordinator.accept_delivery("driver-1", "dlv-1").unwrap();
        assert_eq!(receipt.current_load, 100.0);
    }

    #[test]
    fn test_accept_unknown_driver_or_delivery() {
        let (coordinator, storage, drivers) = test_coordinator();
        register_driver(&drivers, "driver-1", 500.0);
        seed_request(&storage, "dlv-1", "buyer-1", 10.0);

        let err = coordinator.accept_delivery("ghost", "dlv-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::DriverNotFound);

        let err = coordinator.accept_delivery("driver-1", "missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::DeliveryNotFound);
    }

    #[test]
    fn test_list_pending_role_visibility() {
        let (coordinator, storage, _drivers) = test_coordinator();
        seed_request(&storage, "dlv-1", "buyer-1", 10.0);
        seed_request(&storage, "dlv-2", "buyer-2", 10.0);

        assert_eq!(
            coordinator.list_pending(Role::Driver, "driver-1").unwrap().len(),
            2
        );
        assert_eq!(
            coordinator.list_pending(Role::Admin, "admin-1").unwrap().len(),
            2
        );

        let mine = coordinator.list_pending(Role::Buyer, "buyer-1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].buyer_id, "buyer-1");

        let theirs = coordinator.list_pending(Role::Farmer, "farmer-1").unwrap();
        assert_eq!(theirs.len(), 2);
        assert!(coordinator
            .list_pending(Role::Farmer, "farmer-2")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_concurrent_accepts_single_winner() {
        let (coordinator, storage, drivers) = test_coordinator();
        for i in 0..8 {
            register_driver(&drivers, &format!("driver-{}", i), 500.0);
        }
        seed_request(&storage, "dlv-1", "buyer-1", 60.0);

        let successes: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let coordinator = coordinator.clone();
                    scope.spawn(move || {
                        coordinator
                            .accept_delivery(&format!("driver-{}", i), "dlv-1")
                            .is_ok() as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(successes, 1);
        assert!(storage.list_pending_deliveries().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_accepts_never_exceed_capacity() {
        let (coordinator, storage, drivers) = test_coordinator();
        register_driver(&drivers, "driver-1", 100.0);
        for i in 0..6 {
            seed_request(&storage, &format!("dlv-{}", i), "buyer-1", 30.0);
        }

        std::thread::scope(|scope| {
            for i in 0..6 {
                let coordinator = coordinator.clone();
                scope.spawn(move || {
                    let _ = coordinator.accept_delivery("driver-1", &format!("dlv-{}", i));
                });
            }
        });

        let load = storage.driver_load("driver-1").unwrap();
        assert!(load <= 100.0, "driver load {} exceeds capacity", load);
        // Counter and accepted rows agree
        assert_eq!(load, storage.sum_accepted_weights("driver-1").unwrap());
        // 3 of the 30 kg requests fit into 100 kg
        assert_eq!(coordinator.list_accepted("driver-1").unwrap().len(), 3);
    }
}
