//! Relational storage capability.
//!
//! Services never talk to a database directly. They receive an
//! `Arc<dyn Storage>` and either call its single-statement operations or open
//! a transaction with [`Storage::begin`] and drive a [`StoreTx`] through the
//! unit of work in [`crate::unit_of_work`].
//!
//! Two backends implement the capability:
//!
//! - [`InMemoryStore`]: tests and local development.
//! - [`PostgresStore`]: `sqlx` over a `PgPool`.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use storefront_cart::{AddItem, CartItem, CartLine};
use storefront_catalog::{NewReview, Product, Review};
use storefront_core::{
    CartId, Money, OrderId, OrderLineId, ProductId, Quantity, ReviewId, UserId,
};
use storefront_orders::{Order, OrderLine, OrderLineRequest, OrderLineView, OrderStatus};

use crate::accounts::NewUser;
use crate::config::StoreBackend;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-level failure.
///
/// Backends translate their native errors into these variants; nothing above
/// the store layer sees a driver error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection, pool or I/O failure, or any error without a finer mapping.
    #[error("{0}")]
    Unavailable(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// A CHECK constraint or numeric range was violated by a write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A row could not be turned into a domain value.
    #[error("failed to decode row: {0}")]
    Decode(String),
}

/// Non-transactional store operations plus the transaction factory.
///
/// Every method is a single statement (or the in-memory equivalent), so it
/// is atomic on its own.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a transaction. Dropping the handle without `commit` rolls it back.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;

    // Catalog

    /// All products ordered by id.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn get_stock(&self, id: ProductId) -> StoreResult<Option<i32>>;

    /// Reviews for a product, oldest first.
    async fn reviews_for_product(&self, id: ProductId) -> StoreResult<Vec<Review>>;

    async fn insert_review(&self, review: &NewReview) -> StoreResult<ReviewId>;

    async fn user_exists(&self, id: UserId) -> StoreResult<bool>;

    // Cart ledger

    async fn cart_for_user(&self, user_id: UserId) -> StoreResult<Option<CartId>>;

    /// Cart projection ordered by cart item id.
    async fn cart_lines(&self, cart_id: CartId) -> StoreResult<Vec<CartLine>>;

    /// Insert the row, or add to the quantity of the existing
    /// `(cart_id, product_id)` row. A new row snapshots the product's price.
    async fn upsert_cart_item(&self, cart_id: CartId, add: &AddItem) -> StoreResult<CartItem>;

    /// Returns the number of rows deleted (0 or 1).
    async fn delete_cart_item(&self, cart_id: CartId, product_id: ProductId) -> StoreResult<u64>;

    async fn clear_cart(&self, cart_id: CartId) -> StoreResult<u64>;

    // Orders (read side and status)

    /// Order lines joined with products, ordered by order id then line id.
    async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<OrderLineView>>;

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Returns the number of orders updated (0 or 1).
    async fn update_order_status(&self, id: OrderId, status: &OrderStatus) -> StoreResult<u64>;
}

/// Operations available inside an open transaction.
///
/// All reads see the transaction's own writes. Nothing is visible to other
/// callers until [`StoreTx::commit`].
#[async_trait]
pub trait StoreTx: Send {
    async fn read_stock(&mut self, product_id: ProductId) -> StoreResult<Option<i32>>;

    /// `stock = stock - quantity` only where `stock >= quantity`.
    ///
    /// Returns the affected row count; 0 means the guard failed.
    async fn try_decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<u64>;

    async fn increment_stock(&mut self, product_id: ProductId, quantity: Quantity)
        -> StoreResult<u64>;

    async fn user_exists(&mut self, user_id: UserId) -> StoreResult<bool>;

    /// Insert an order header with status `pending`.
    async fn insert_order(&mut self, user_id: UserId, total: Money) -> StoreResult<OrderId>;

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &OrderLineRequest,
    ) -> StoreResult<OrderLineId>;

    /// Lines of an order, ordered by line id. Empty when the order is absent.
    async fn order_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderLine>>;

    /// Delete the order's lines and header. Returns headers deleted (0 or 1).
    async fn delete_order(&mut self, order_id: OrderId) -> StoreResult<u64>;

    /// Find the user's cart and lock it until the transaction ends. Cart item
    /// writes from other callers wait for the lock.
    async fn cart_for_user(&mut self, user_id: UserId) -> StoreResult<Option<CartId>>;

    /// Cart rows as order lines priced at `COALESCE(price_at_time, price)`.
    async fn checkout_lines(&mut self, cart_id: CartId) -> StoreResult<Vec<OrderLineRequest>>;

    async fn clear_cart(&mut self, cart_id: CartId) -> StoreResult<u64>;

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<UserId>;

    async fn insert_cart(&mut self, user_id: UserId) -> StoreResult<CartId>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Open the configured backend. Postgres tables are created when missing.
pub async fn open(backend: &StoreBackend) -> StoreResult<Arc<dyn Storage>> {
    match backend {
        StoreBackend::InMemory { seed_demo_data } => {
            let store = if *seed_demo_data {
                InMemoryStore::with_demo_data().await?
            } else {
                InMemoryStore::new()
            };
            tracing::info!(seed_demo_data, "using in-memory store");
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres {
            url,
            max_connections,
        } => {
            let store = PostgresStore::connect(url, *max_connections).await?;
            store.init_schema().await?;
            tracing::info!(max_connections, "using postgres store");
            Ok(Arc::new(store))
        }
    }
}
