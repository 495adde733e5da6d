use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use storefront_core::{Entity, Money, ProductId};

/// Catalog entry with its live stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    /// Units on hand. Never negative at any observable point.
    pub stock: i32,
    pub created_at: NaiveDateTime,
}

impl Product {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::of(self.stock)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Coarse stock classification used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    Low,
    Available,
}

impl StockLevel {
    /// Stock at or below this count is reported as `Low`.
    pub const LOW_THRESHOLD: i32 = 5;

    pub fn of(stock: i32) -> Self {
        if stock <= 0 {
            StockLevel::OutOfStock
        } else if stock <= Self::LOW_THRESHOLD {
            StockLevel::Low
        } else {
            StockLevel::Available
        }
    }
}
