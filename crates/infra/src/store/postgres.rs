//! Postgres-backed store implementation.
//!
//! ## Money
//!
//! Prices and totals are `NUMERIC(10,2)` columns. They cross the driver
//! boundary as integer cents: writes bind a `BIGINT` and divide by 100 in
//! SQL, reads select `(col * 100)::bigint`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (check violation / out of range) | `23514` / `22003` | `Constraint` |
//! | Database (other) | Any other | `Unavailable` |
//! | ColumnDecode / Decode / ColumnNotFound | N/A | `Decode` |
//! | PoolClosed, Io, Tls, PoolTimedOut, ... | N/A | `Unavailable` |
//!
//! ## Concurrency
//!
//! Transactions run at Postgres' default `READ COMMITTED`. The stock guard is
//! the conditional `UPDATE ... WHERE stock >= $1`: a writer that waited on a
//! concurrent writer's row lock re-evaluates the predicate and reports zero
//! affected rows when the stock is gone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, field, instrument, Span};

use storefront_cart::{AddItem, CartItem, CartLine};
use storefront_catalog::{NewReview, Product, Review};
use storefront_core::{
    CartId, CartItemId, Money, OrderId, OrderLineId, ProductId, Quantity, ReviewId, UserId,
};
use storefront_orders::{Order, OrderLine, OrderLineRequest, OrderLineView, OrderStatus};

use super::{Storage, StoreError, StoreResult, StoreTx};
use crate::accounts::NewUser;

/// Idempotent DDL for every table the store touches.
pub const SCHEMA: &str = include_str!("schema.sql");

/// Postgres-backed [`Storage`].
///
/// Uses a SQLx connection pool, which is thread-safe (Arc + Send + Sync).
/// Transactions borrow a pooled connection until commit or rollback.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    /// Create a new PostgresStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables. Existing tables are left untouched.
    #[instrument(skip(self), err)]
    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("init_schema", e))?;
        debug!("schema ready");
        Ok(())
    }

    /// Insert a product. Products have no create operation of their own.
    #[instrument(skip(self, description), err)]
    pub async fn seed_product(
        &self,
        name: &str,
        description: Option<&str>,
        price: Money,
        stock: i32,
    ) -> StoreResult<ProductId> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, description, price, stock)
            VALUES ($1, $2, ($3::bigint)::numeric / 100, $4)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(cents(price)?)
        .bind(stock)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("seed_product", e))?;
        Ok(ProductId::new(id))
    }
}

#[async_trait]
impl Storage for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(operation = field::Empty, product_count = field::Empty), err)]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let span = Span::current();
        span.record("operation", "list_products");

        let rows = sqlx::query(
            r#"
            SELECT id, name, description, (price * 100)::bigint AS price_cents, stock, created_at
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = decode_rows::<ProductRow, Product>("list_products", &rows)?;
        span.record("product_count", products.len());
        Ok(products)
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Span::current().record("operation", "get_product");

        let row = sqlx::query(
            r#"
            SELECT id, name, description, (price * 100)::bigint AS price_cents, stock, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| decode_row::<ProductRow, Product>("get_product", &r))
            .transpose()
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn get_stock(&self, id: ProductId) -> StoreResult<Option<i32>> {
        Span::current().record("operation", "get_stock");

        sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_stock", e))
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn reviews_for_product(&self, id: ProductId) -> StoreResult<Vec<Review>> {
        Span::current().record("operation", "reviews_for_product");

        let rows = sqlx::query(
            r#"
            SELECT id, product_id, user_id, rating, comment, created_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reviews_for_product", e))?;

        decode_rows::<ReviewRow, Review>("reviews_for_product", &rows)
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn insert_review(&self, review: &NewReview) -> StoreResult<ReviewId> {
        Span::current().record("operation", "insert_review");

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO reviews (user_id, product_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(review.user_id().get())
        .bind(review.product_id().get())
        .bind(review.rating())
        .bind(review.comment())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_review", e))?;
        Ok(ReviewId::new(id))
    }

    async fn user_exists(&self, id: UserId) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_exists", e))
    }

    async fn cart_for_user(&self, user_id: UserId) -> StoreResult<Option<CartId>> {
        let id: Option<i32> = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("cart_for_user", e))?;
        Ok(id.map(CartId::new))
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn cart_lines(&self, cart_id: CartId) -> StoreResult<Vec<CartLine>> {
        Span::current().record("operation", "cart_lines");

        let rows = sqlx::query(
            r#"
            SELECT
                ci.id AS cart_item_id,
                ci.product_id,
                p.name AS product_name,
                p.description AS product_description,
                ci.quantity,
                (ci.price_at_time * 100)::bigint AS price_at_time_cents,
                (p.price * 100)::bigint AS price_cents
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id ASC
            "#,
        )
        .bind(cart_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_lines", e))?;

        decode_rows::<CartLineRow, CartLine>("cart_lines", &rows)
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn upsert_cart_item(&self, cart_id: CartId, add: &AddItem) -> StoreResult<CartItem> {
        Span::current().record("operation", "upsert_cart_item");

        // The SELECT yields no row for an unknown product, so nothing is inserted.
        // The share lock on the cart makes a merge wait for an open checkout.
        let row = sqlx::query(
            r#"
            WITH cart AS (
                SELECT id FROM carts WHERE id = $1 FOR SHARE
            )
            INSERT INTO cart_items (cart_id, product_id, quantity, price_at_time)
            SELECT cart.id, p.id, $3, p.price
            FROM cart, products p
            WHERE p.id = $2
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, cart_id, product_id, quantity,
                      (price_at_time * 100)::bigint AS price_at_time_cents
            "#,
        )
        .bind(cart_id.get())
        .bind(add.product_id.get())
        .bind(add.quantity.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_cart_item", e))?;

        match row {
            Some(row) => decode_row::<CartItemRow, CartItem>("upsert_cart_item", &row),
            None => Err(StoreError::ForeignKeyViolation(format!(
                "product {} does not exist",
                add.product_id
            ))),
        }
    }

    async fn delete_cart_item(&self, cart_id: CartId, product_id: ProductId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id.get())
            .bind(product_id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cart_item", e))?;
        Ok(result.rows_affected())
    }

    async fn clear_cart(&self, cart_id: CartId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(operation = field::Empty, line_count = field::Empty), err)]
    async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<OrderLineView>> {
        let span = Span::current();
        span.record("operation", "orders_for_user");

        let rows = sqlx::query(
            r#"
            SELECT
                o.id AS order_id,
                o.user_id,
                oi.product_id,
                p.name AS product_name,
                p.description AS product_description,
                oi.quantity,
                (oi.price * 100)::bigint AS price_cents,
                o.status,
                o.created_at
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            JOIN products p ON p.id = oi.product_id
            WHERE o.user_id = $1
            ORDER BY o.id ASC, oi.id ASC
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders_for_user", e))?;

        let views = decode_rows::<OrderLineViewRow, OrderLineView>("orders_for_user", &rows)?;
        span.record("line_count", views.len());
        Ok(views)
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Span::current().record("operation", "get_order");

        let header = sqlx::query(
            r#"
            SELECT id, user_id, (total * 100)::bigint AS total_cents, status, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(header) = header else {
            return Ok(None);
        };
        let header = OrderHeaderRow::from_row(&header).map_err(|e| map_sqlx_error("get_order", e))?;

        let rows = sqlx::query(ORDER_LINES_SQL)
            .bind(id.get())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        let lines = decode_rows::<OrderLineRow, OrderLine>("get_order", &rows)?;

        header.into_order(lines).map(Some)
    }

    #[instrument(skip(self), fields(operation = field::Empty), err)]
    async fn update_order_status(&self, id: OrderId, status: &OrderStatus) -> StoreResult<u64> {
        Span::current().record("operation", "update_order_status");

        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_order_status", e))?;
        Ok(result.rows_affected())
    }
}

const ORDER_LINES_SQL: &str = r#"
    SELECT id, product_id, quantity, (price * 100)::bigint AS price_cents
    FROM order_items
    WHERE order_id = $1
    ORDER BY id ASC
"#;

/// Open Postgres transaction.
///
/// Dropping it without `commit` rolls back (sqlx issues the `ROLLBACK` when
/// the connection returns to the pool).
struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn read_stock(&mut self, product_id: ProductId) -> StoreResult<Option<i32>> {
        sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("read_stock", e))
    }

    #[instrument(skip(self), fields(operation = "try_decrement_stock"), err)]
    async fn try_decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $1")
                .bind(quantity.get())
                .bind(product_id.get())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("try_decrement_stock", e))?;
        Ok(result.rows_affected())
    }

    async fn increment_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE products SET stock = stock + $1 WHERE id = $2")
            .bind(quantity.get())
            .bind(product_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("increment_stock", e))?;
        Ok(result.rows_affected())
    }

    async fn user_exists(&mut self, user_id: UserId) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("user_exists", e))
    }

    async fn insert_order(&mut self, user_id: UserId, total: Money) -> StoreResult<OrderId> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, total, status)
            VALUES ($1, ($2::bigint)::numeric / 100, 'pending')
            RETURNING id
            "#,
        )
        .bind(user_id.get())
        .bind(cents(total)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(OrderId::new(id))
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &OrderLineRequest,
    ) -> StoreResult<OrderLineId> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price)
            VALUES ($1, $2, $3, ($4::bigint)::numeric / 100)
            RETURNING id
            "#,
        )
        .bind(order_id.get())
        .bind(line.product_id.get())
        .bind(line.quantity.get())
        .bind(cents(line.price)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        Ok(OrderLineId::new(id))
    }

    async fn order_lines(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderLine>> {
        let rows = sqlx::query(ORDER_LINES_SQL)
            .bind(order_id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("order_lines", e))?;
        decode_rows::<OrderLineRow, OrderLine>("order_lines", &rows)
    }

    async fn delete_order(&mut self, order_id: OrderId) -> StoreResult<u64> {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_items", e))?;

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(result.rows_affected())
    }

    async fn cart_for_user(&mut self, user_id: UserId) -> StoreResult<Option<CartId>> {
        // Locked until commit. Cart item inserts (FOR KEY SHARE via the foreign
        // key) and merges (FOR SHARE in the upsert) wait on it.
        let id: Option<i32> =
            sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id.get())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("cart_for_user", e))?;
        Ok(id.map(CartId::new))
    }

    async fn checkout_lines(&mut self, cart_id: CartId) -> StoreResult<Vec<OrderLineRequest>> {
        let rows = sqlx::query(
            r#"
            SELECT
                ci.product_id,
                ci.quantity,
                (COALESCE(ci.price_at_time, p.price) * 100)::bigint AS price_cents
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id ASC
            "#,
        )
        .bind(cart_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("checkout_lines", e))?;

        decode_rows::<CheckoutLineRow, OrderLineRequest>("checkout_lines", &rows)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(result.rows_affected())
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<UserId> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(user.username())
        .bind(user.email())
        .bind(user.password_hash())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(UserId::new(id))
    }

    async fn insert_cart(&mut self, user_id: UserId) -> StoreResult<CartId> {
        let id: i32 = sqlx::query_scalar("INSERT INTO carts (user_id) VALUES ($1) RETURNING id")
            .bind(user_id.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_cart", e))?;
        Ok(CartId::new(id))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn cents(amount: Money) -> StoreResult<i64> {
    amount
        .cents_i64()
        .map_err(|e| StoreError::Constraint(e.to_string()))
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                Some("23514") | Some("22003") => StoreError::Constraint(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("failed to decode row in {}: {}", operation, err))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_row<'r, R, T>(operation: &str, row: &'r PgRow) -> StoreResult<T>
where
    R: FromRow<'r, PgRow> + TryInto<T, Error = StoreError>,
{
    R::from_row(row)
        .map_err(|e| map_sqlx_error(operation, e))?
        .try_into()
}

fn decode_rows<'r, R, T>(operation: &str, rows: &'r [PgRow]) -> StoreResult<Vec<T>>
where
    R: FromRow<'r, PgRow> + TryInto<T, Error = StoreError>,
{
    rows.iter().map(|row| decode_row::<R, T>(operation, row)).collect()
}

fn money(column: &str, cents: i64) -> StoreResult<Money> {
    Money::from_cents_i64(cents).map_err(|e| StoreError::Decode(format!("{column}: {e}")))
}

fn quantity(column: &str, raw: i32) -> StoreResult<Quantity> {
    Quantity::new(i64::from(raw)).map_err(|e| StoreError::Decode(format!("{column}: {e}")))
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i32,
    name: String,
    description: Option<String>,
    price_cents: i64,
    stock: i32,
    created_at: Option<NaiveDateTime>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price_cents: row.try_get("price_cents")?,
            stock: row.try_get("stock")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: money("products.price", row.price_cents)?,
            stock: row.stock,
            created_at: row.created_at.unwrap_or_default(),
        })
    }
}

#[derive(Debug)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    rating: Option<i32>,
    comment: Option<String>,
    created_at: Option<NaiveDateTime>,
}

impl<'r> FromRow<'r, PgRow> for ReviewRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ReviewRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            user_id: row.try_get("user_id")?,
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user_id: UserId::new(row.user_id),
            rating: row
                .rating
                .ok_or_else(|| StoreError::Decode(format!("review {} has no rating", row.id)))?,
            comment: row.comment,
            created_at: row.created_at.unwrap_or_default(),
        })
    }
}

#[derive(Debug)]
struct CartItemRow {
    id: i32,
    cart_id: i32,
    product_id: i32,
    quantity: i32,
    price_at_time_cents: Option<i64>,
}

impl<'r> FromRow<'r, PgRow> for CartItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CartItemRow {
            id: row.try_get("id")?,
            cart_id: row.try_get("cart_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            price_at_time_cents: row.try_get("price_at_time_cents")?,
        })
    }
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(CartItem {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            quantity: quantity("cart_items.quantity", row.quantity)?,
            price_at_time: row
                .price_at_time_cents
                .map(|c| money("cart_items.price_at_time", c))
                .transpose()?,
        })
    }
}

#[derive(Debug)]
struct CartLineRow {
    cart_item_id: i32,
    product_id: i32,
    product_name: String,
    product_description: Option<String>,
    quantity: i32,
    price_at_time_cents: Option<i64>,
    price_cents: i64,
}

impl<'r> FromRow<'r, PgRow> for CartLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CartLineRow {
            cart_item_id: row.try_get("cart_item_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            product_description: row.try_get("product_description")?,
            quantity: row.try_get("quantity")?,
            price_at_time_cents: row.try_get("price_at_time_cents")?,
            price_cents: row.try_get("price_cents")?,
        })
    }
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = StoreError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let snapshot = row
            .price_at_time_cents
            .map(|c| money("cart_items.price_at_time", c))
            .transpose()?;
        CartLine::new(
            CartItemId::new(row.cart_item_id),
            ProductId::new(row.product_id),
            row.product_name,
            row.product_description,
            quantity("cart_items.quantity", row.quantity)?,
            snapshot,
            money("products.price", row.price_cents)?,
        )
        .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[derive(Debug)]
struct CheckoutLineRow {
    product_id: i32,
    quantity: i32,
    price_cents: i64,
}

impl<'r> FromRow<'r, PgRow> for CheckoutLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CheckoutLineRow {
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            price_cents: row.try_get("price_cents")?,
        })
    }
}

impl TryFrom<CheckoutLineRow> for OrderLineRequest {
    type Error = StoreError;

    fn try_from(row: CheckoutLineRow) -> Result<Self, Self::Error> {
        Ok(OrderLineRequest {
            product_id: ProductId::new(row.product_id),
            quantity: quantity("cart_items.quantity", row.quantity)?,
            price: money("cart_items.price_at_time", row.price_cents)?,
        })
    }
}

#[derive(Debug)]
struct OrderHeaderRow {
    id: i32,
    user_id: i32,
    total_cents: i64,
    status: String,
    created_at: Option<NaiveDateTime>,
}

impl<'r> FromRow<'r, PgRow> for OrderHeaderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderHeaderRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            total_cents: row.try_get("total_cents")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl OrderHeaderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> StoreResult<Order> {
        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            total: money("orders.total", self.total_cents)?,
            status: OrderStatus::from(self.status),
            created_at: self.created_at.unwrap_or_default(),
            lines,
        })
    }
}

#[derive(Debug)]
struct OrderLineRow {
    id: i32,
    product_id: i32,
    quantity: i32,
    price_cents: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderLineRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            price_cents: row.try_get("price_cents")?,
        })
    }
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = StoreError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(OrderLine {
            id: OrderLineId::new(row.id),
            product_id: ProductId::new(row.product_id),
            quantity: quantity("order_items.quantity", row.quantity)?,
            price: money("order_items.price", row.price_cents)?,
        })
    }
}

#[derive(Debug)]
struct OrderLineViewRow {
    order_id: i32,
    user_id: i32,
    product_id: i32,
    product_name: String,
    product_description: Option<String>,
    quantity: i32,
    price_cents: i64,
    status: String,
    created_at: Option<NaiveDateTime>,
}

impl<'r> FromRow<'r, PgRow> for OrderLineViewRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderLineViewRow {
            order_id: row.try_get("order_id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            product_description: row.try_get("product_description")?,
            quantity: row.try_get("quantity")?,
            price_cents: row.try_get("price_cents")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<OrderLineViewRow> for OrderLineView {
    type Error = StoreError;

    fn try_from(row: OrderLineViewRow) -> Result<Self, Self::Error> {
        Ok(OrderLineView {
            order_id: OrderId::new(row.order_id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            product_description: row.product_description,
            quantity: quantity("order_items.quantity", row.quantity)?,
            price: money("order_items.price", row.price_cents)?,
            status: OrderStatus::from(row.status),
            created_at: row.created_at.unwrap_or_default(),
        })
    }
}
