//! Order engine domain module.
//!
//! Order shapes, the status enumeration and the pure decisions the engine
//! makes while placing an order: request validation, per-line stock checks
//! and totals. Executing those decisions against a store lives in
//! `storefront-infra`.

pub mod order;
pub mod request;
pub mod status;
pub mod stock;

pub use order::{Order, OrderLine, OrderLineView};
pub use request::{order_total, validate_lines, OrderLineRequest, PlaceOrder};
pub use status::OrderStatus;
pub use stock::StockCheck;
