//! Shared server state

use crate::auth::{JwtConfig, JwtService};
use crate::core::Config;
use crate::dispatch::{CapacityLedger, DispatchCoordinator};
use crate::events::EventBus;
use crate::orders::OrderLifecycle;
use crate::refunds::RefundWorkflow;
use crate::services::{CartService, DriverDirectory};
use crate::storage::MarketStorage;
use shared::error::{AppError, AppResult};
use std::sync::Arc;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub storage: MarketStorage,
    pub carts: CartService,
    pub drivers: DriverDirectory,
    pub orders: OrderLifecycle,
    pub capacity: CapacityLedger,
    pub dispatch: DispatchCoordinator,
    pub refunds: RefundWorkflow,
    pub jwt: Arc<JwtService>,
    pub events: EventBus,
}

impl ServerState {
    /// Open storage under the configured working directory and wire up the
    /// coordinators
    pub fn new(config: Config) -> AppResult<Self> {
        std::fs::create_dir_all(&config.work_dir)
            .map_err(|e| AppError::internal(format!("cannot create work dir: {}", e)))?;
        let storage = MarketStorage::open(config.database_path())
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(Self::with_storage(config, storage))
    }

    /// Build state over an existing storage handle
    pub fn with_storage(config: Config, storage: MarketStorage) -> Self {
        let events = EventBus::new();
        let carts = CartService::new(storage.clone());
        let drivers = DriverDirectory::new();
        let jwt = Arc::new(JwtService::new(config.jwt.clone()));

        let orders = OrderLifecycle::new(storage.clone(), carts.clone(), events.clone());
        let capacity = CapacityLedger::new(storage.clone(), drivers.clone());
        let dispatch = DispatchCoordinator::new(storage.clone(), drivers.clone(), events.clone());
        let refunds = RefundWorkflow::new(storage.clone(), events.clone());

        Self {
            config: Arc::new(config),
            storage,
            carts,
            drivers,
            orders,
            capacity,
            dispatch,
            refunds,
            jwt,
            events,
        }
    }

    /// State over an in-memory database (for testing)
    pub fn in_memory() -> AppResult<Self> {
        let storage =
            MarketStorage::open_in_memory().map_err(|e| AppError::database(e.to_string()))?;
        let config = Config {
            work_dir: String::new(),
            http_port: 0,
            jwt: JwtConfig {
                secret: "test-secret-key-for-unit-tests-only".to_string(),
                expiration_minutes: 60,
                issuer: "market-server".to_string(),
                audience: "market-clients".to_string(),
            },
            environment: "test".to_string(),
        };
        Ok(Self::with_storage(config, storage))
    }
}
