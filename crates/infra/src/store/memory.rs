//! In-memory store for tests and local development.
//!
//! All state sits behind one async mutex. A transaction takes the mutex for
//! its whole lifetime and works on a copy of the state; `commit` swaps the
//! copy in, while `rollback` or drop throws it away. Transactions are
//! therefore serializable.
//!
//! Non-transactional [`Storage`] calls also take the mutex, so they wait for
//! any open transaction. Code holding a [`StoreTx`] must not call back into
//! the same store outside that transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use storefront_cart::{AddItem, Cart, CartItem, CartLine};
use storefront_catalog::{NewReview, Product, Review};
use storefront_core::{
    upsert_row, CartId, CartItemId, Money, OrderId, OrderLineId, ProductId, Quantity, ReviewId,
    UserId,
};
use storefront_orders::{Order, OrderLine, OrderLineRequest, OrderLineView, OrderStatus};

use super::{Storage, StoreError, StoreResult, StoreTx};
use crate::accounts::NewUser;

#[derive(Debug, Clone)]
struct UserRow {
    username: String,
    email: String,
    #[allow(dead_code)]
    password_hash: String,
    #[allow(dead_code)]
    created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
struct OrderRow {
    user_id: UserId,
    total: Money,
    status: OrderStatus,
    created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
struct OrderLineRow {
    order_id: OrderId,
    line: OrderLine,
}

/// Per-table id counters, mirroring `SERIAL` columns.
#[derive(Debug, Clone, Default)]
struct Sequences {
    user: i32,
    product: i32,
    cart: i32,
    cart_item: i32,
    order: i32,
    order_line: i32,
    review: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    seq: Sequences,
    users: BTreeMap<UserId, UserRow>,
    products: BTreeMap<ProductId, Product>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, OrderRow>,
    order_lines: BTreeMap<OrderLineId, OrderLineRow>,
    reviews: BTreeMap<ReviewId, Review>,
}

impl MemoryState {
    fn product(&self, id: ProductId) -> StoreResult<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| StoreError::ForeignKeyViolation(format!("product {id} does not exist")))
    }

    fn require_user(&self, id: UserId) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!("user {id} does not exist")))
        }
    }

    fn require_cart(&self, id: CartId) -> StoreResult<()> {
        if self.carts.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!("cart {id} does not exist")))
        }
    }

    fn stock(&self, id: ProductId) -> Option<i32> {
        self.products.get(&id).map(|p| p.stock)
    }

    fn try_decrement_stock(&mut self, id: ProductId, quantity: Quantity) -> u64 {
        match self.products.get_mut(&id) {
            Some(p) if p.stock >= quantity.get() => {
                p.stock -= quantity.get();
                1
            }
            _ => 0,
        }
    }

    fn increment_stock(&mut self, id: ProductId, quantity: Quantity) -> StoreResult<u64> {
        match self.products.get_mut(&id) {
            Some(p) => {
                p.stock = p.stock.checked_add(quantity.get()).ok_or_else(|| {
                    StoreError::Constraint(format!("stock for product {id} out of range"))
                })?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn cart_for_user(&self, user_id: UserId) -> Option<CartId> {
        self.carts
            .values()
            .find(|c| c.user_id == user_id)
            .map(|c| c.id)
    }

    fn cart_items(&self, cart_id: CartId) -> impl Iterator<Item = &CartItem> {
        self.cart_items.values().filter(move |i| i.cart_id == cart_id)
    }

    fn cart_lines(&self, cart_id: CartId) -> StoreResult<Vec<CartLine>> {
        self.cart_items(cart_id)
            .map(|item| {
                let product = self.product(item.product_id)?;
                CartLine::new(
                    item.id,
                    item.product_id,
                    product.name.clone(),
                    product.description.clone(),
                    item.quantity,
                    item.price_at_time,
                    product.price,
                )
                .map_err(|e| StoreError::Constraint(e.to_string()))
            })
            .collect()
    }

    fn checkout_lines(&self, cart_id: CartId) -> StoreResult<Vec<OrderLineRequest>> {
        self.cart_items(cart_id)
            .map(|item| {
                let product = self.product(item.product_id)?;
                Ok(OrderLineRequest {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price_at_time.unwrap_or(product.price),
                })
            })
            .collect()
    }

    fn upsert_cart_item(&mut self, cart_id: CartId, add: &AddItem) -> StoreResult<CartItem> {
        self.require_cart(cart_id)?;
        let price = self.product(add.product_id)?.price;

        let existing = self
            .cart_items
            .values_mut()
            .find(|i| i.cart_id == cart_id && i.product_id == add.product_id);
        if let Some(item) = existing {
            item.merge(add).map_err(|_| {
                StoreError::Constraint(format!(
                    "cart_items.quantity out of range for product {}",
                    add.product_id
                ))
            })?;
            return Ok(item.clone());
        }

        let item = CartItem {
            id: CartItemId::new(next(&mut self.seq.cart_item)),
            cart_id,
            product_id: add.product_id,
            quantity: add.quantity,
            price_at_time: Some(price),
        };
        upsert_row(&mut self.cart_items, item.clone());
        Ok(item)
    }

    fn delete_cart_item(&mut self, cart_id: CartId, product_id: ProductId) -> u64 {
        let before = self.cart_items.len();
        self.cart_items
            .retain(|_, i| !(i.cart_id == cart_id && i.product_id == product_id));
        (before - self.cart_items.len()) as u64
    }

    fn clear_cart(&mut self, cart_id: CartId) -> u64 {
        let before = self.cart_items.len();
        self.cart_items.retain(|_, i| i.cart_id != cart_id);
        (before - self.cart_items.len()) as u64
    }

    fn order_lines(&self, order_id: OrderId) -> Vec<OrderLine> {
        self.order_lines
            .values()
            .filter(|row| row.order_id == order_id)
            .map(|row| row.line.clone())
            .collect()
    }

    fn insert_order(&mut self, user_id: UserId, total: Money) -> StoreResult<OrderId> {
        self.require_user(user_id)?;
        let id = OrderId::new(next(&mut self.seq.order));
        self.orders.insert(
            id,
            OrderRow {
                user_id,
                total,
                status: OrderStatus::Pending,
                created_at: now(),
            },
        );
        Ok(id)
    }

    fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &OrderLineRequest,
    ) -> StoreResult<OrderLineId> {
        if !self.orders.contains_key(&order_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "order {order_id} does not exist"
            )));
        }
        self.product(line.product_id)?;
        let id = OrderLineId::new(next(&mut self.seq.order_line));
        self.order_lines.insert(
            id,
            OrderLineRow {
                order_id,
                line: OrderLine {
                    id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    price: line.price,
                },
            },
        );
        Ok(id)
    }

    fn delete_order(&mut self, order_id: OrderId) -> u64 {
        self.order_lines.retain(|_, row| row.order_id != order_id);
        self.orders.remove(&order_id).map_or(0, |_| 1)
    }

    fn insert_user(&mut self, user: &NewUser) -> StoreResult<UserId> {
        let taken = self
            .users
            .values()
            .any(|u| u.username == user.username() || u.email == user.email());
        if taken {
            return Err(StoreError::UniqueViolation(
                "users_username_key or users_email_key".to_string(),
            ));
        }
        let id = UserId::new(next(&mut self.seq.user));
        self.users.insert(
            id,
            UserRow {
                username: user.username().to_string(),
                email: user.email().to_string(),
                password_hash: user.password_hash().to_string(),
                created_at: now(),
            },
        );
        Ok(id)
    }

    fn insert_cart(&mut self, user_id: UserId) -> StoreResult<CartId> {
        self.require_user(user_id)?;
        if self.cart_for_user(user_id).is_some() {
            return Err(StoreError::UniqueViolation("carts_user_id_key".to_string()));
        }
        let id = CartId::new(next(&mut self.seq.cart));
        upsert_row(&mut self.carts, Cart { id, user_id });
        Ok(id)
    }

    fn get_order(&self, id: OrderId) -> Option<Order> {
        self.orders.get(&id).map(|row| Order {
            id,
            user_id: row.user_id,
            total: row.total,
            status: row.status.clone(),
            created_at: row.created_at,
            lines: self.order_lines(id),
        })
    }

    fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<OrderLineView>> {
        let mut views = Vec::new();
        for (order_id, order) in self.orders.iter().filter(|(_, o)| o.user_id == user_id) {
            for line in self.order_lines(*order_id) {
                let product = self.product(line.product_id)?;
                views.push(OrderLineView {
                    order_id: *order_id,
                    user_id,
                    product_id: line.product_id,
                    product_name: product.name.clone(),
                    product_description: product.description.clone(),
                    quantity: line.quantity,
                    price: line.price,
                    status: order.status.clone(),
                    created_at: order.created_at,
                });
            }
        }
        Ok(views)
    }

    fn insert_review(&mut self, review: &NewReview) -> StoreResult<ReviewId> {
        self.product(review.product_id())?;
        self.require_user(review.user_id())?;
        let id = ReviewId::new(next(&mut self.seq.review));
        upsert_row(
            &mut self.reviews,
            Review {
                id,
                product_id: review.product_id(),
                user_id: review.user_id(),
                rating: review.rating(),
                comment: review.comment().map(str::to_string),
                created_at: now(),
            },
        );
        Ok(id)
    }
}

/// In-memory [`Storage`] backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with a handful of products.
    pub async fn with_demo_data() -> StoreResult<Self> {
        let store = Self::new();
        let demo = [
            ("Mechanical Keyboard", "Tenkeyless, brown switches", 8999, 25),
            ("Wireless Mouse", "2.4 GHz, rechargeable", 2999, 40),
            ("USB-C Hub", "7-in-1 with HDMI", 4550, 15),
            ("27\" Monitor", "1440p IPS", 32900, 5),
        ];
        for (name, description, cents, stock) in demo {
            store
                .seed_product(name, Some(description), Money::from_cents(cents), stock)
                .await?;
        }
        Ok(store)
    }

    /// Insert a product. Products have no create operation of their own.
    pub async fn seed_product(
        &self,
        name: &str,
        description: Option<&str>,
        price: Money,
        stock: i32,
    ) -> StoreResult<ProductId> {
        if stock < 0 {
            return Err(StoreError::Constraint(format!(
                "products_stock_check: stock {stock} is negative"
            )));
        }
        let mut state = self.state.lock().await;
        let id = ProductId::new(next(&mut state.seq.product));
        upsert_row(
            &mut state.products,
            Product {
                id,
                name: name.to_string(),
                description: description.map(str::to_string),
                price,
                stock,
                created_at: now(),
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> StoreResult<()> {
        let _state = self.state.lock().await;
        Ok(())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.state.lock().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn get_stock(&self, id: ProductId) -> StoreResult<Option<i32>> {
        Ok(self.state.lock().await.stock(id))
    }

    async fn reviews_for_product(&self, id: ProductId) -> StoreResult<Vec<Review>> {
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.product_id == id)
            .cloned()
            .collect())
    }

    async fn insert_review(&self, review: &NewReview) -> StoreResult<ReviewId> {
        self.state.lock().await.insert_review(review)
    }

    async fn user_exists(&self, id: UserId) -> StoreResult<bool> {
        Ok(self.state.lock().await.users.contains_key(&id))
    }

    async fn cart_for_user(&self, user_id: UserId) -> StoreResult<Option<CartId>> {
        Ok(self.state.lock().await.cart_for_user(user_id))
    }

    async fn cart_lines(&self, cart_id: CartId) -> StoreResult<Vec<CartLine>> {
        self.state.lock().await.cart_lines(cart_id)
    }

    async fn upsert_cart_item(&self, cart_id: CartId, add: &AddItem) -> StoreResult<CartItem> {
        self.state.lock().await.upsert_cart_item(cart_id, add)
    }

    async fn delete_cart_item(&self, cart_id: CartId, product_id: ProductId) -> StoreResult<u64> {
        Ok(self.state.lock().await.delete_cart_item(cart_id, product_id))
    }

    async fn clear_cart(&self, cart_id: CartId) -> StoreResult<u64> {
        Ok(self.state.lock().await.clear_cart(cart_id))
    }

    async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<OrderLineView>> {
        self.state.lock().await.orders_for_user(user_id)
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.state.lock().await.get_order(id))
    }

    async fn update_order_status(&self, id: OrderId, status: &OrderStatus) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        match state.orders.get_mut(&id) {
            Some(order) => {
                order.status = status.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// Open in-memory transaction: exclusive access plus a private working copy.
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn read_stock(&mut self, product_id: ProductId) -> StoreResult<Option<i32>> {
        Ok(self.working.stock(product_id))
    }

    async fn try_decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<u64> {
        Ok(self.working.try_decrement_stock(product_id, quantity))
    }

    async fn increment_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<u64> {
        self.working.increment_stock(product_id, quantity)
    }

    async fn user_exists(&mut self, user_id: UserId) -> StoreResult<bool> {
        Ok(self.working.users.contains_key(&user_id))
    }

    async fn insert_order(&mut self, user_id: UserId, total: Money) -> StoreResult<OrderId> {
        self.working.insert_order(user_id, total)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &OrderLineRequest,
    ) -> StoreResult<OrderLineId> {
        self.working.insert_order_line(order_id, line)
    }

    async fn order_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderLine>> {
        Ok(self.working.order_lines(order_id))
    }

    async fn delete_order(&mut self, order_id: OrderId) -> StoreResult<u64> {
        Ok(self.working.delete_order(order_id))
    }

    async fn cart_for_user(&mut self, user_id: UserId) -> StoreResult<Option<CartId>> {
        Ok(self.working.cart_for_user(user_id))
    }

    async fn checkout_lines(&mut self, cart_id: CartId) -> StoreResult<Vec<OrderLineRequest>> {
        self.working.checkout_lines(cart_id)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> StoreResult<u64> {
        Ok(self.working.clear_cart(cart_id))
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<UserId> {
        self.working.insert_user(user)
    }

    async fn insert_cart(&mut self, user_id: UserId) -> StoreResult<CartId> {
        self.working.insert_cart(user_id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        debug!("in-memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        drop(self);
        Ok(())
    }
}
