use uuid::Uuid;
use agrimart_catalog::{InventoryManager, NewProduct, Product};
use agrimart_core::{Actor, CoreError, CoreResult, Role};

use crate::context::WorkflowContext;

/// Seller listings
#[derive(Clone)]
pub struct CatalogService {
    ctx: WorkflowContext,
}

impl CatalogService {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn create_product(&self, actor: &Actor, input: NewProduct) -> CoreResult<Product> {
        actor.require_role(Role::Seller)?;
        let product = Product::new(actor.user_id, input, self.ctx.now())?;

        let mut tx = self.ctx.begin().await?;
        tx.put_product(&product).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, seller_id = %product.seller_id, name = %product.name, "Product listed");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> CoreResult<Product> {
        let mut tx = self.ctx.begin().await?;
        tx.get_product(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("product", product_id))
    }

    /// Active listings, optionally for one seller
    pub async fn list_products(&self, seller_id: Option<Uuid>) -> CoreResult<Vec<Product>> {
        let mut tx = self.ctx.begin().await?;
        let products = tx.list_products(seller_id).await?;
        Ok(products.into_iter().filter(|p| p.is_active).collect())
    }

    pub async fn restock(&self, actor: &Actor, product_id: Uuid, quantity: i64) -> CoreResult<Product> {
        let now = self.ctx.now();
        let mut tx = self.ctx.begin().await?;
        let mut product = tx
            .get_product(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("product", product_id))?;
        actor.require_owner(Role::Seller, product.seller_id)?;

        InventoryManager::restock(&mut product, quantity, now)?;
        tx.put_product(&product).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, added = quantity, stock = product.stock, "Product restocked");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[tokio::test]
    async fn test_restock_by_owner_only() {
        let h = Harness::new().await;
        let other = h.register(Role::Seller, "rival@farm.in").await;

        let result = h.market.catalog.restock(&other, h.product_id, 5).await;
        assert!(matches!(result, Err(CoreError::Forbidden(_))));

        let product = h.market.catalog.restock(&h.seller, h.product_id, 5).await.unwrap();
        assert_eq!(product.stock, 15);
    }

    #[tokio::test]
    async fn test_checkout_beyond_stock_fails() {
        let h = Harness::new().await;
        let result = h.market.orders.place_order(&h.buyer, h.checkout(11)).await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert_eq!(h.market.catalog.get_product(h.product_id).await.unwrap().stock, 10);
    }
}
