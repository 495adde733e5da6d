//! Infrastructure layer: storage backends, the transaction boundary, the
//! services built on them, and configuration.

pub mod accounts;
pub mod cart_ledger;
pub mod catalog;
pub mod config;
pub mod error;
pub mod order_engine;
pub mod store;
pub mod unit_of_work;

pub use accounts::{Accounts, NewUser};
pub use cart_ledger::CartLedger;
pub use catalog::Catalog;
pub use config::{AppConfig, ConfigError, StoreBackend};
pub use error::{ServiceError, ServiceResult};
pub use order_engine::OrderEngine;
pub use store::{InMemoryStore, PostgresStore, Storage, StoreError, StoreResult, StoreTx};

#[cfg(test)]
mod integration_tests;
