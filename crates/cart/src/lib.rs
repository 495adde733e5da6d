//! Cart ledger domain module.
//!
//! Per-user carts of line items. Adding a product that is already in the cart
//! merges into the existing line; cart changes never touch product stock.

pub mod cart;
pub mod line;

pub use cart::{AddItem, Cart, CartItem};
pub use line::{cart_total, CartLine};
