//! Cart service
//!
//! Carts live in the same storage as orders so that order creation can clear
//! the buyer's cart inside its own transaction.

use crate::storage::{MarketStorage, StorageResult};
use redb::WriteTransaction;
use shared::error::{AppError, AppResult};
use shared::models::CartItem;

#[derive(Clone)]
pub struct CartService {
    storage: MarketStorage,
}

impl CartService {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    /// Get a buyer's cart (empty if none stored)
    pub fn get_cart(&self, buyer_id: &str) -> AppResult<Vec<CartItem>> {
        self.storage
            .get_cart(buyer_id)
            .map_err(|e| AppError::database(e.to_string()))
    }

    /// Replace a buyer's cart
    pub fn set_cart(&self, buyer_id: &str, items: &[CartItem]) -> AppResult<()> {
        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .set_cart(&txn, buyer_id, items)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    /// Clear a buyer's cart in its own transaction
    pub fn clear_cart(&self, buyer_id: &str) -> AppResult<()> {
        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .clear_cart(&txn, buyer_id)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    /// Clear a buyer's cart as part of an enclosing transaction
    pub fn clear_cart_in_txn(&self, txn: &WriteTransaction, buyer_id: &str) -> StorageResult<()> {
        self.storage.clear_cart(txn, buyer_id)
    }
}
