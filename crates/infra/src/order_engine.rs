//! Order engine service.
//!
//! Placing an order runs, for each line in submission order and inside one
//! transaction:
//!
//! 1. read the product's stock through the transaction,
//! 2. reject with `OutOfStock` / `InsufficientStock`,
//! 3. conditionally decrement (`stock >= q` guard); zero affected rows means
//!    a concurrent writer won, reported as `ConcurrentStockChange`,
//! 4. insert the order line.
//!
//! Any failure rolls back every decrement and the order header. Deleting an
//! order gives each line's quantity back to stock in the same transaction
//! that removes the order.

use std::sync::Arc;

use tracing::{info, instrument};

use storefront_core::{DomainError, OrderId, UserId};
use storefront_orders::{Order, OrderLineRequest, OrderLineView, OrderStatus, PlaceOrder, StockCheck};

use crate::error::ServiceResult;
use crate::store::{Storage, StoreTx};
use crate::unit_of_work::transactional;

#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn Storage>,
}

impl OrderEngine {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Place a multi-line order. All-or-nothing.
    #[instrument(
        skip(self, lines),
        fields(user_id = %user_id, line_count = lines.len()),
        err(level = "warn")
    )]
    pub async fn place_order(
        &self,
        user_id: UserId,
        lines: Vec<OrderLineRequest>,
    ) -> ServiceResult<OrderId> {
        let order = PlaceOrder::new(user_id, lines)?;

        let order_id = transactional(&*self.store, "place_order", move |tx| {
            Box::pin(async move {
                require_user(tx, order.user_id()).await?;
                apply_order(tx, &order).await
            })
        })
        .await?;

        info!(order_id = %order_id, "order placed");
        Ok(order_id)
    }

    /// Turn the user's cart into an order and empty the cart.
    ///
    /// Lines are priced at the cart's unit price (the snapshot taken when the
    /// item was first added, or the current product price).
    #[instrument(skip(self), err(level = "warn"))]
    pub async fn checkout(&self, user_id: UserId) -> ServiceResult<OrderId> {
        let order_id = transactional(&*self.store, "checkout", move |tx| {
            Box::pin(async move { checkout_cart(tx, user_id).await })
        })
        .await?;

        info!(order_id = %order_id, "cart checked out");
        Ok(order_id)
    }

    /// Overwrite the status. Any value is accepted.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> ServiceResult<()> {
        let updated = self.store.update_order_status(order_id, &status).await?;
        if updated == 0 {
            return Err(DomainError::not_found("order", order_id).into());
        }
        info!(status = %status, "order status updated");
        Ok(())
    }

    /// Delete the order and give its quantities back to stock.
    #[instrument(skip(self), err(level = "warn"))]
    pub async fn delete_order(&self, order_id: OrderId) -> ServiceResult<()> {
        let restored = transactional(&*self.store, "delete_order", move |tx| {
            Box::pin(async move { remove_order(tx, order_id).await })
        })
        .await?;

        info!(lines_restored = restored, "order deleted");
        Ok(())
    }

    /// Every order line of the user, ordered by order id then line id.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn get_orders_by_user(&self, user_id: UserId) -> ServiceResult<Vec<OrderLineView>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }

    #[instrument(skip(self), err(level = "debug"))]
    pub async fn get_order(&self, order_id: OrderId) -> ServiceResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id).into())
    }
}

async fn require_user(tx: &mut dyn StoreTx, user_id: UserId) -> ServiceResult<()> {
    if tx.user_exists(user_id).await? {
        Ok(())
    } else {
        Err(DomainError::not_found("user", user_id).into())
    }
}

/// Create the order header and reserve stock line by line, inside `tx`.
///
/// The caller owns the transaction; on error it must roll back.
pub async fn apply_order(tx: &mut dyn StoreTx, order: &PlaceOrder) -> ServiceResult<OrderId> {
    let order_id = tx.insert_order(order.user_id(), order.total()).await?;
    for line in order.lines() {
        reserve_stock(tx, line).await?;
        tx.insert_order_line(order_id, line).await?;
    }
    Ok(order_id)
}

async fn reserve_stock(tx: &mut dyn StoreTx, line: &OrderLineRequest) -> ServiceResult<()> {
    let available = tx
        .read_stock(line.product_id)
        .await?
        .ok_or_else(|| DomainError::not_found("product", line.product_id))?;

    if let Err(shortage) = StockCheck::ensure(line.product_id, available, line.quantity) {
        info!(product_id = %line.product_id, available, requested = %line.quantity, "stock check failed");
        return Err(shortage.into());
    }

    if tx.try_decrement_stock(line.product_id, line.quantity).await? == 0 {
        info!(product_id = %line.product_id, requested = %line.quantity, "conditional decrement lost a race");
        return Err(DomainError::ConcurrentStockChange {
            product_id: line.product_id,
            requested: line.quantity.get(),
        }
        .into());
    }
    Ok(())
}

async fn checkout_cart(tx: &mut dyn StoreTx, user_id: UserId) -> ServiceResult<OrderId> {
    let cart_id = tx
        .cart_for_user(user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("cart for user", user_id))?;

    let lines = tx.checkout_lines(cart_id).await?;
    if lines.is_empty() {
        return Err(DomainError::invalid("cart is empty").into());
    }

    let order = PlaceOrder::new(user_id, lines)?;
    let order_id = apply_order(tx, &order).await?;
    tx.clear_cart(cart_id).await?;
    Ok(order_id)
}

/// Restore stock for every line, then delete lines and header.
///
/// Returns the number of lines restored. `NotFound` when no header was
/// deleted, which also rolls back any increments already applied.
async fn remove_order(tx: &mut dyn StoreTx, order_id: OrderId) -> ServiceResult<usize> {
    let lines = tx.order_lines(order_id).await?;
    for line in &lines {
        tx.increment_stock(line.product_id, line.quantity).await?;
    }
    if tx.delete_order(order_id).await? == 0 {
        return Err(DomainError::not_found("order", order_id).into());
    }
    Ok(lines.len())
}
