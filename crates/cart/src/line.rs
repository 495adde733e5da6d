use serde::{Deserialize, Serialize};

use storefront_core::{CartItemId, DomainError, DomainResult, Money, ProductId, Quantity};

/// Denormalized cart row as shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_description: Option<String>,
    pub quantity: Quantity,
    /// `price_at_time` when captured, otherwise the current product price.
    pub price_at_time: Money,
    pub total_price: Money,
}

impl CartLine {
    pub fn new(
        cart_item_id: CartItemId,
        product_id: ProductId,
        product_name: String,
        product_description: Option<String>,
        quantity: Quantity,
        price_at_time: Option<Money>,
        current_price: Money,
    ) -> DomainResult<Self> {
        let unit_price = price_at_time.unwrap_or(current_price);
        let total_price = unit_price
            .checked_mul(quantity)
            .ok_or_else(|| DomainError::invalid("cart line total is too large"))?;
        Ok(Self {
            cart_item_id,
            product_id,
            product_name,
            product_description,
            quantity,
            price_at_time: unit_price,
            total_price,
        })
    }
}

/// Sum of line totals.
pub fn cart_total(lines: &[CartLine]) -> DomainResult<Money> {
    lines.iter().try_fold(Money::ZERO, |acc, line| {
        acc.checked_add(line.total_price)
            .ok_or_else(|| DomainError::invalid("cart total is too large"))
    })
}
