use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Produce categories listed in the shop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Grains,
    Pulses,
    Vegetables,
    Fruits,
    Dairy,
    Spices,
    Other,
}

/// A seller's listing. Prices are whole rupees per `unit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
    pub price: i64,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Seller input for a new listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: ProductCategory,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub price: i64,
    pub stock: i64,
}

fn default_unit() -> String {
    "kg".to_string()
}

impl Product {
    pub fn new(seller_id: Uuid, input: NewProduct, now: DateTime<Utc>) -> Result<Self, ProductError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ProductError::InvalidListing("name must not be empty".to_string()));
        }
        if input.price <= 0 {
            return Err(ProductError::InvalidListing(format!("price must be positive, got {}", input.price)));
        }
        if input.stock < 0 {
            return Err(ProductError::InvalidListing(format!("stock must not be negative, got {}", input.stock)));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            seller_id,
            name: name.to_string(),
            category: input.category,
            unit: input.unit,
            price: input.price,
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Price of `quantity` units, refusing inactive listings and overflow
    pub fn quote(&self, quantity: i64) -> Result<i64, ProductError> {
        if !self.is_active {
            return Err(ProductError::NotAvailable(self.id.to_string()));
        }
        if quantity <= 0 {
            return Err(ProductError::InvalidQuantity(quantity));
        }
        self.price
            .checked_mul(quantity)
            .ok_or(ProductError::InvalidQuantity(quantity))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("Product not available: {0}")]
    NotAvailable(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Invalid listing: {0}")]
    InvalidListing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(price: i64) -> NewProduct {
        NewProduct {
            name: "Basmati Rice".to_string(),
            category: ProductCategory::Grains,
            unit: "kg".to_string(),
            price,
            stock: 50,
        }
    }

    #[test]
    fn test_quote_multiplies_price() {
        let product = Product::new(Uuid::new_v4(), listing(200), Utc::now()).unwrap();
        assert_eq!(product.quote(2).unwrap(), 400);
    }

    #[test]
    fn test_quote_rejects_inactive_and_zero_quantity() {
        let mut product = Product::new(Uuid::new_v4(), listing(200), Utc::now()).unwrap();
        assert!(matches!(product.quote(0), Err(ProductError::InvalidQuantity(0))));

        product.is_active = false;
        assert!(matches!(product.quote(1), Err(ProductError::NotAvailable(_))));
    }

    #[test]
    fn test_new_rejects_bad_price() {
        assert!(Product::new(Uuid::new_v4(), listing(0), Utc::now()).is_err());
    }
}
