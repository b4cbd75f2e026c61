use crate::product::Product;
use chrono::{DateTime, Utc};

/// Stock bookkeeping on a product document.
///
/// Callers hold the product inside an open store transaction, so the
/// check-and-decrement here is not racing anyone.
pub struct InventoryManager;

impl InventoryManager {
    /// Take stock for a new order
    pub fn reserve(product: &mut Product, quantity: i64, now: DateTime<Utc>) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        if product.stock < quantity {
            return Err(InventoryError::InsufficientStock {
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;
        product.updated_at = now;
        Ok(())
    }

    /// Put stock back after a cancellation
    pub fn release(product: &mut Product, quantity: i64, now: DateTime<Utc>) -> Result<(), InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        product.stock = product
            .stock
            .checked_add(quantity)
            .ok_or(InventoryError::InvalidQuantity(quantity))?;
        product.updated_at = now;
        Ok(())
    }

    /// Seller restock
    pub fn restock(product: &mut Product, quantity: i64, now: DateTime<Utc>) -> Result<(), InventoryError> {
        Self::release(product, quantity, now)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: i64,
        available: i64,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
}
