//! Catalog domain module.
//!
//! Products and their reviews, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage). Products are read-only to this crate; stock
//! changes are driven by the order engine through the store.

pub mod product;
pub mod review;

pub use product::{Product, StockLevel};
pub use review::{NewReview, Review, MAX_RATING, MIN_RATING};
