use serde::Deserialize;

use storefront_cart::{CartItem, CartLine};
use storefront_catalog::{Product, Review};
use storefront_core::{DomainError, DomainResult, Money, ProductId, Quantity};
use storefront_orders::{Order, OrderLineRequest, OrderLineView};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: i32,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    pub user_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderLine {
    pub product_id: i32,
    pub quantity: i64,
    pub price: Money,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: i32,
    pub lines: Vec<PlaceOrderLine>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

impl PlaceOrderLine {
    pub fn into_request(self) -> DomainResult<OrderLineRequest> {
        if self.product_id <= 0 {
            return Err(DomainError::invalid(format!(
                "malformed ProductId: must be positive, got {}",
                self.product_id
            )));
        }
        Ok(OrderLineRequest {
            product_id: ProductId::new(self.product_id),
            quantity: Quantity::new(self.quantity)?,
            price: self.price,
        })
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id,
        "name": p.name,
        "description": p.description,
        "price": p.price,
        "stock": p.stock,
        "stock_level": p.stock_level(),
        "created_at": p.created_at,
    })
}

pub fn review_to_json(r: Review) -> serde_json::Value {
    serde_json::json!({
        "id": r.id,
        "product_id": r.product_id,
        "user_id": r.user_id,
        "rating": r.rating,
        "comment": r.comment,
        "created_at": r.created_at,
    })
}

pub fn cart_item_to_json(item: CartItem) -> serde_json::Value {
    serde_json::json!({
        "id": item.id,
        "cart_id": item.cart_id,
        "product_id": item.product_id,
        "quantity": item.quantity,
        "price_at_time": item.price_at_time,
    })
}

pub fn cart_to_json(lines: Vec<CartLine>) -> serde_json::Value {
    let total = storefront_cart::cart_total(&lines).ok();
    let items: Vec<_> = lines
        .into_iter()
        .map(|l| {
            serde_json::json!({
                "cart_item_id": l.cart_item_id,
                "product_id": l.product_id,
                "product_name": l.product_name,
                "product_description": l.product_description,
                "quantity": l.quantity,
                "price_at_time": l.price_at_time,
                "total_price": l.total_price,
            })
        })
        .collect();
    serde_json::json!({ "items": items, "total": total })
}

pub fn order_to_json(o: Order) -> serde_json::Value {
    let lines: Vec<_> = o
        .lines
        .into_iter()
        .map(|l| {
            serde_json::json!({
                "id": l.id,
                "product_id": l.product_id,
                "quantity": l.quantity,
                "price": l.price,
            })
        })
        .collect();
    serde_json::json!({
        "id": o.id,
        "user_id": o.user_id,
        "total": o.total,
        "status": o.status,
        "created_at": o.created_at,
        "lines": lines,
    })
}

pub fn order_line_view_to_json(v: OrderLineView) -> serde_json::Value {
    serde_json::json!({
        "order_id": v.order_id,
        "user_id": v.user_id,
        "product_id": v.product_id,
        "product_name": v.product_name,
        "product_description": v.product_description,
        "quantity": v.quantity,
        "price": v.price,
        "status": v.status,
        "created_at": v.created_at,
    })
}
