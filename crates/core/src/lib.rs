//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, fixed-point money, quantities and the domain error taxonomy.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod quantity;
pub mod value_object;

pub use entity::{upsert_row, Entity};
pub use error::{DomainError, DomainResult};
pub use id::{CartId, CartItemId, OrderId, OrderLineId, ProductId, ReviewId, UserId};
pub use money::Money;
pub use quantity::Quantity;
pub use value_object::ValueObject;
