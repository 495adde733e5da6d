use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Money, ProductId, Quantity, UserId};

/// One requested order line: `quantity` units of a product at `price` each.
///
/// Both `quantity > 0` and `price >= 0` are enforced by the field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Money,
}

impl OrderLineRequest {
    pub fn line_total(&self) -> DomainResult<Money> {
        self.price
            .checked_mul(self.quantity)
            .ok_or_else(|| DomainError::invalid("order line total is too large"))
    }
}

/// Lines must be non-empty. Unit prices and the order total must fit the
/// store's price columns.
pub fn validate_lines(lines: &[OrderLineRequest]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::invalid("an order needs at least one line"));
    }
    for line in lines {
        line.price.ensure_storable("line price")?;
    }
    order_total(lines)?.ensure_storable("order total")?;
    Ok(())
}

/// Sum of `quantity × price` over all lines.
pub fn order_total(lines: &[OrderLineRequest]) -> DomainResult<Money> {
    lines.iter().try_fold(Money::ZERO, |acc, line| {
        acc.checked_add(line.line_total()?)
            .ok_or_else(|| DomainError::invalid("order total is too large"))
    })
}

/// A validated order placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    user_id: UserId,
    lines: Vec<OrderLineRequest>,
    total: Money,
}

impl PlaceOrder {
    pub fn new(user_id: UserId, lines: Vec<OrderLineRequest>) -> DomainResult<Self> {
        validate_lines(&lines)?;
        let total = order_total(&lines)?;
        Ok(Self {
            user_id,
            lines,
            total,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Lines in submission order.
    pub fn lines(&self) -> &[OrderLineRequest] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }
}
