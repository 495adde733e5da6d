use storefront_core::{DomainError, DomainResult, ProductId, Quantity};

/// Outcome of comparing a product's current stock with a requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCheck {
    Sufficient,
    /// Nothing left at all.
    OutOfStock,
    /// Some left, but fewer units than requested.
    Insufficient,
}

impl StockCheck {
    pub fn evaluate(available: i32, requested: Quantity) -> Self {
        if available <= 0 {
            StockCheck::OutOfStock
        } else if available < requested.get() {
            StockCheck::Insufficient
        } else {
            StockCheck::Sufficient
        }
    }

    /// Turn a negative outcome into the matching domain error.
    pub fn into_result(
        self,
        product_id: ProductId,
        available: i32,
        requested: Quantity,
    ) -> DomainResult<()> {
        match self {
            StockCheck::Sufficient => Ok(()),
            StockCheck::OutOfStock => Err(DomainError::OutOfStock {
                product_id,
                available,
                requested: requested.get(),
            }),
            StockCheck::Insufficient => Err(DomainError::InsufficientStock {
                product_id,
                available,
                requested: requested.get(),
            }),
        }
    }

    /// Evaluate and convert in one step.
    pub fn ensure(product_id: ProductId, available: i32, requested: Quantity) -> DomainResult<()> {
        Self::evaluate(available, requested).into_result(product_id, available, requested)
    }
}
