use std::sync::Arc;

use storefront_infra::{Accounts, CartLedger, Catalog, OrderEngine, Storage};

/// Services shared by every handler. All of them run against the same store.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn Storage>,
    pub catalog: Catalog,
    pub cart: CartLedger,
    pub orders: OrderEngine,
    pub accounts: Accounts,
}

impl AppServices {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            cart: CartLedger::new(store.clone()),
            orders: OrderEngine::new(store.clone()),
            accounts: Accounts::new(store.clone()),
            store,
        }
    }
}
