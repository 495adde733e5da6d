//! Cart ledger service.
//!
//! Cart mutations are single statements and never touch product stock;
//! stock only moves when an order is placed or deleted.

use std::sync::Arc;

use tracing::{debug, instrument};

use storefront_cart::{AddItem, CartItem, CartLine};
use storefront_core::{CartId, DomainError, ProductId, UserId};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Storage, StoreError};

#[derive(Clone)]
pub struct CartLedger {
    store: Arc<dyn Storage>,
}

impl CartLedger {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    async fn cart_of(&self, user_id: UserId) -> ServiceResult<CartId> {
        self.store
            .cart_for_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart for user", user_id).into())
    }

    /// Add `quantity` units, merging into an existing line for the same product.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> ServiceResult<CartItem> {
        let add = AddItem::new(product_id, quantity)?;
        let cart_id = self.cart_of(user_id).await?;

        let item = self
            .store
            .upsert_cart_item(cart_id, &add)
            .await
            .map_err(|err| match err {
                StoreError::ForeignKeyViolation(_) => {
                    ServiceError::from(DomainError::not_found("product", product_id))
                }
                StoreError::Constraint(msg) => ServiceError::from(DomainError::invalid(msg)),
                other => ServiceError::from(other),
            })?;

        debug!(cart_item_id = %item.id, quantity = %item.quantity, "cart item upserted");
        Ok(item)
    }

    /// Remove the product's line. Removing an absent line succeeds.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> ServiceResult<()> {
        let cart_id = self.cart_of(user_id).await?;
        let removed = self.store.delete_cart_item(cart_id, product_id).await?;
        debug!(removed, "cart item removed");
        Ok(())
    }

    /// Remove every line. Idempotent.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn clear_cart(&self, user_id: UserId) -> ServiceResult<()> {
        let cart_id = self.cart_of(user_id).await?;
        let removed = self.store.clear_cart(cart_id).await?;
        debug!(removed, "cart cleared");
        Ok(())
    }

    #[instrument(skip(self), err(level = "debug"))]
    pub async fn get_cart(&self, user_id: UserId) -> ServiceResult<Vec<CartLine>> {
        let cart_id = self.cart_of(user_id).await?;
        Ok(self.store.cart_lines(cart_id).await?)
    }
}
