pub mod product;
pub mod inventory;

pub use product::{NewProduct, Product, ProductCategory, ProductError};
pub use inventory::{InventoryError, InventoryManager};
