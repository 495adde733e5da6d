//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing entities, stock shortages, lost updates). Infrastructure concerns
/// belong to the store layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A product, cart, order or user does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A value failed validation (non-positive quantity, malformed id, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The product has no stock left at all.
    #[error("product_id {product_id} is out of stock (available: {available}, requested: {requested})")]
    OutOfStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    /// The product has some stock, but less than requested.
    #[error("not enough stock for product_id {product_id} (available: {available}, requested: {requested})")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    /// A conditional stock decrement affected no rows: another writer got there first.
    #[error("stock for product_id {product_id} changed concurrently (requested: {requested})")]
    ConcurrentStockChange { product_id: ProductId, requested: i32 },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Stable machine-readable code, used by adapters in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::OutOfStock { .. } => "out_of_stock",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::ConcurrentStockChange { .. } => "concurrent_stock_change",
        }
    }

    /// True for the failures caused by a lack of stock (including lost races for it).
    pub fn is_stock_shortage(&self) -> bool {
        matches!(
            self,
            Self::OutOfStock { .. } | Self::InsufficientStock { .. } | Self::ConcurrentStockChange { .. }
        )
    }
}
