//! redb-based storage layer for the fulfillment core
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order records |
//! | `orders_by_buyer` | `(buyer_id, order_id)` | `()` | Buyer order index |
//! | `pending_deliveries` | `delivery_id` | `DeliveryRequest` | Pending pool |
//! | `accepted_deliveries` | `delivery_id` | `AcceptedDelivery` | Accepted snapshots |
//! | `accepted_by_driver` | `(driver_id, delivery_id)` | `()` | Driver index |
//! | `driver_loads` | `driver_id` | `f64` | Committed weight per driver |
//! | `refund_requests` | `request_id` | `RefundRequest` | Refund records |
//! | `refunds_by_order` | `(order_id, request_id)` | `()` | Order refund index |
//! | `active_refunds` | `order_id` | `request_id` | Active (non-rejected) request |
//! | `carts` | `buyer_id` | `Vec<CartItem>` | Buyer carts |
//!
//! # Concurrency
//!
//! redb allows a single write transaction at a time; every multi-effect
//! operation (order creation, delivery acceptance, refund processing) runs
//! inside one `begin_write()` and re-verifies its preconditions there, so
//! concurrent callers serialize at the commit point. Reads run on MVCC
//! snapshots and never block writers.
//!
//! `driver_loads` is a materialized aggregate: it changes only in the same
//! transaction that inserts an accepted delivery, so counter and rows cannot
//! drift apart.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{AcceptedDelivery, CartItem, DeliveryRequest, Order, RefundRequest};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Index of orders per buyer: key = (buyer_id, order_id), value = empty
const ORDERS_BY_BUYER_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("orders_by_buyer");

/// Pending delivery pool: key = delivery_id, value = JSON-serialized DeliveryRequest
const PENDING_DELIVERIES_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("pending_deliveries");

/// Accepted delivery snapshots: key = delivery_id, value = JSON-serialized AcceptedDelivery
const ACCEPTED_DELIVERIES_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("accepted_deliveries");

/// Index of accepted deliveries per driver: key = (driver_id, delivery_id), value = empty
const ACCEPTED_BY_DRIVER_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("accepted_by_driver");

/// Materialized committed weight per driver: key = driver_id, value = kg
const DRIVER_LOADS_TABLE: TableDefinition<&str, f64> = TableDefinition::new("driver_loads");

/// Refund requests: key = request_id, value = JSON-serialized RefundRequest
const REFUND_REQUESTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("refund_requests");

/// Index of refund requests per order: key = (order_id, request_id), value = empty
const REFUNDS_BY_ORDER_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("refunds_by_order");

/// Active (non-rejected) refund request per order: key = order_id, value = request_id
const ACTIVE_REFUNDS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("active_refunds");

/// Buyer carts: key = buyer_id, value = JSON-serialized Vec<CartItem>
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Marketplace storage backed by redb
#[derive(Clone)]
pub struct MarketStorage {
    db: Arc<Database>,
}

impl MarketStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// write is persistent, and the file is always in a consistent state
    /// thanks to copy-on-write with an atomic root swap.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_BY_BUYER_TABLE)?;
            let _ = write_txn.open_table(PENDING_DELIVERIES_TABLE)?;
            let _ = write_txn.open_table(ACCEPTED_DELIVERIES_TABLE)?;
            let _ = write_txn.open_table(ACCEPTED_BY_DRIVER_TABLE)?;
            let _ = write_txn.open_table(DRIVER_LOADS_TABLE)?;
            let _ = write_txn.open_table(REFUND_REQUESTS_TABLE)?;
            let _ = write_txn.open_table(REFUNDS_BY_ORDER_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_REFUNDS_TABLE)?;
            let _ = write_txn.open_table(CARTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    ///
    /// Dropping the transaction without committing aborts every write made
    /// through it.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Operations ==========

    /// Store an order and its buyer index entry
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let value = serde_json::to_vec(order)?;
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            table.insert(order.id.as_str(), value.as_slice())?;
        }
        let mut index = txn.open_table(ORDERS_BY_BUYER_TABLE)?;
        index.insert((order.buyer_id.as_str(), order.id.as_str()), ())?;
        Ok(())
    }

    /// Get an order within a write transaction
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List all orders, newest first
    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            orders.push(order);
        }

        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }

    /// List a buyer's orders, newest first
    pub fn list_orders_for_buyer(&self, buyer_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDERS_BY_BUYER_TABLE)?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in index.range((buyer_id, "")..)? {
            let (key, _value) = result?;
            let (owner, order_id) = key.value();
            if owner != buyer_id {
                break;
            }
            if let Some(value) = table.get(order_id)? {
                let order: Order = serde_json::from_slice(value.value())?;
                orders.push(order);
            }
        }

        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }

    // ========== Cart Operations ==========

    /// Get a buyer's cart (empty if none stored)
    pub fn get_cart(&self, buyer_id: &str) -> StorageResult<Vec<CartItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        match table.get(buyer_id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a buyer's cart within a transaction
    pub fn set_cart(
        &self,
        txn: &WriteTransaction,
        buyer_id: &str,
        items: &[CartItem],
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CARTS_TABLE)?;
        let value = serde_json::to_vec(items)?;
        table.insert(buyer_id, value.as_slice())?;
        Ok(())
    }

    /// Clear a buyer's cart within a transaction
    pub fn clear_cart(&self, txn: &WriteTransaction, buyer_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(CARTS_TABLE)?;
        table.remove(buyer_id)?;
        Ok(())
    }

    // ========== Pending Delivery Operations ==========

    /// Store a pending delivery request
    pub fn store_pending_delivery(
        &self,
        txn: &WriteTransaction,
        request: &DeliveryRequest,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_DELIVERIES_TABLE)?;
        let value = serde_json::to_vec(request)?;
        table.insert(request.delivery_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a pending delivery request within a write transaction
    ///
    /// Returns `None` once a driver has accepted the request (acceptance
    /// removes it from the pool in the same transaction).
    pub fn get_pending_delivery_txn(
        &self,
        txn: &WriteTransaction,
        delivery_id: &str,
    ) -> StorageResult<Option<DeliveryRequest>> {
        let table = txn.open_table(PENDING_DELIVERIES_TABLE)?;
        match table.get(delivery_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Remove a delivery request from the pending pool
    pub fn remove_pending_delivery(
        &self,
        txn: &WriteTransaction,
        delivery_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_DELIVERIES_TABLE)?;
        table.remove(delivery_id)?;
        Ok(())
    }

    /// List every pending delivery request, oldest first
    pub fn list_pending_deliveries(&self) -> StorageResult<Vec<DeliveryRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_DELIVERIES_TABLE)?;

        let mut requests = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let request: DeliveryRequest = serde_json::from_slice(value.value())?;
            requests.push(request);
        }

        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    // ========== Accepted Delivery Operations ==========

    /// Store an accepted delivery snapshot and its driver index entry
    pub fn store_accepted_delivery(
        &self,
        txn: &WriteTransaction,
        accepted: &AcceptedDelivery,
    ) -> StorageResult<()> {
        let value = serde_json::to_vec(accepted)?;
        {
            let mut table = txn.open_table(ACCEPTED_DELIVERIES_TABLE)?;
            table.insert(accepted.delivery_id.as_str(), value.as_slice())?;
        }
        let mut index = txn.open_table(ACCEPTED_BY_DRIVER_TABLE)?;
        index.insert(
            (accepted.driver_id.as_str(), accepted.delivery_id.as_str()),
            (),
        )?;
        Ok(())
    }

    /// Get an accepted delivery by id
    pub fn get_accepted_delivery(
        &self,
        delivery_id: &str,
    ) -> StorageResult<Option<AcceptedDelivery>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCEPTED_DELIVERIES_TABLE)?;
        match table.get(delivery_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List a driver's accepted deliveries, oldest first
    pub fn list_accepted_for_driver(
        &self,
        driver_id: &str,
    ) -> StorageResult<Vec<AcceptedDelivery>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCEPTED_BY_DRIVER_TABLE)?;
        let table = read_txn.open_table(ACCEPTED_DELIVERIES_TABLE)?;

        let mut accepted = Vec::new();
        for result in index.range((driver_id, "")..)? {
            let (key, _value) = result?;
            let (owner, delivery_id) = key.value();
            if owner != driver_id {
                break;
            }
            if let Some(value) = table.get(delivery_id)? {
                let row: AcceptedDelivery = serde_json::from_slice(value.value())?;
                accepted.push(row);
            }
        }

        accepted.sort_by_key(|a| a.accepted_at);
        Ok(accepted)
    }

    /// Get a driver's committed load from the materialized counter
    pub fn driver_load(&self, driver_id: &str) -> StorageResult<f64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRIVER_LOADS_TABLE)?;
        Ok(table.get(driver_id)?.map(|g| g.value()).unwrap_or(0.0))
    }

    /// Get a driver's committed load within a write transaction
    pub fn driver_load_txn(&self, txn: &WriteTransaction, driver_id: &str) -> StorageResult<f64> {
        let table = txn.open_table(DRIVER_LOADS_TABLE)?;
        Ok(table.get(driver_id)?.map(|g| g.value()).unwrap_or(0.0))
    }

    /// Set a driver's committed load within a write transaction
    pub fn set_driver_load(
        &self,
        txn: &WriteTransaction,
        driver_id: &str,
        load: f64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(DRIVER_LOADS_TABLE)?;
        table.insert(driver_id, load)?;
        Ok(())
    }

    /// Recompute a driver's load by scanning accepted rows
    ///
    /// The materialized counter is authoritative; this scan exists as a
    /// consistency check.
    pub fn sum_accepted_weights(&self, driver_id: &str) -> StorageResult<f64> {
        let accepted = self.list_accepted_for_driver(driver_id)?;
        Ok(accepted.iter().map(|a| a.weight).sum())
    }

    // ========== Refund Operations ==========

    /// Store a refund request and its order index entry
    pub fn store_refund_request(
        &self,
        txn: &WriteTransaction,
        request: &RefundRequest,
    ) -> StorageResult<()> {
        let value = serde_json::to_vec(request)?;
        {
            let mut table = txn.open_table(REFUND_REQUESTS_TABLE)?;
            table.insert(request.id.as_str(), value.as_slice())?;
        }
        let mut index = txn.open_table(REFUNDS_BY_ORDER_TABLE)?;
        index.insert((request.order_id.as_str(), request.id.as_str()), ())?;
        Ok(())
    }

    /// Get a refund request within a write transaction
    pub fn get_refund_request_txn(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<Option<RefundRequest>> {
        let table = txn.open_table(REFUND_REQUESTS_TABLE)?;
        match table.get(request_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a refund request by id
    pub fn get_refund_request(&self, request_id: &str) -> StorageResult<Option<RefundRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFUND_REQUESTS_TABLE)?;
        match table.get(request_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// List every refund request, newest first
    pub fn list_refund_requests(&self) -> StorageResult<Vec<RefundRequest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFUND_REQUESTS_TABLE)?;

        let mut requests = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let request: RefundRequest = serde_json::from_slice(value.value())?;
            requests.push(request);
        }

        requests.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(requests)
    }

    /// List all refund requests ever filed against an order
    pub fn list_refunds_for_order(&self, order_id: &str) -> StorageResult<Vec<RefundRequest>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(REFUNDS_BY_ORDER_TABLE)?;
        let table = read_txn.open_table(REFUND_REQUESTS_TABLE)?;

        let mut requests = Vec::new();
        for result in index.range((order_id, "")..)? {
            let (key, _value) = result?;
            let (owner, request_id) = key.value();
            if owner != order_id {
                break;
            }
            if let Some(value) = table.get(request_id)? {
                let request: RefundRequest = serde_json::from_slice(value.value())?;
                requests.push(request);
            }
        }

        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    /// Get the id of the active (non-rejected) refund request for an order
    pub fn active_refund_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(ACTIVE_REFUNDS_TABLE)?;
        Ok(table.get(order_id)?.map(|g| g.value().to_string()))
    }

    /// Mark a refund request as the active one for its order
    pub fn set_active_refund(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        request_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_REFUNDS_TABLE)?;
        table.insert(order_id, request_id)?;
        Ok(())
    }

    /// Drop the active refund pointer (on rejection)
    pub fn clear_active_refund(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_REFUNDS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }
}
