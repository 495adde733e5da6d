use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use storefront_core::{Entity, Money, OrderId, OrderLineId, ProductId, Quantity, UserId};

use crate::status::OrderStatus;

/// A stored order line. Price is captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Money,
}

/// Order header with its lines.
///
/// Immutable after placement except for `status`; deleting it gives every
/// line's quantity back to stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Units ordered per product, summed over lines.
    pub fn units_by_product(&self) -> Vec<(ProductId, i64)> {
        let mut units: Vec<(ProductId, i64)> = Vec::new();
        for line in &self.lines {
            match units.iter_mut().find(|(p, _)| *p == line.product_id) {
                Some((_, n)) => *n += i64::from(line.quantity.get()),
                None => units.push((line.product_id, i64::from(line.quantity.get()))),
            }
        }
        units
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Flattened order line joined with its product, as listed per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineView {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_description: Option<String>,
    pub quantity: Quantity,
    pub price: Money,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
}
