use serde::{Deserialize, Serialize};

use storefront_core::{
    CartId, CartItemId, DomainResult, Entity, Money, ProductId, Quantity, UserId,
};

/// One cart per user, created together with the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
}

impl Entity for Cart {
    type Id = CartId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A stored cart row. At most one per `(cart_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Product price captured when the row was first created.
    pub price_at_time: Option<Money>,
}

impl CartItem {
    /// Fold a repeated add into this row.
    ///
    /// Quantities are summed; the original price snapshot is kept.
    pub fn merge(&mut self, add: &AddItem) -> DomainResult<()> {
        debug_assert_eq!(self.product_id, add.product_id);
        self.quantity = self.quantity.checked_add(add.quantity)?;
        Ok(())
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Validated request to put `quantity` units of a product into a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl AddItem {
    /// Accepts the raw request quantity; anything not strictly positive or
    /// too large for the quantity column is rejected.
    pub fn new(product_id: ProductId, quantity: i64) -> DomainResult<Self> {
        Ok(Self {
            product_id,
            quantity: Quantity::new(quantity)?,
        })
    }
}
