use axum::{routing::get, Router};

pub mod cart;
pub mod orders;
pub mod products;
pub mod system;
pub mod users;

/// Router for every endpoint. Services are attached by `build_app`.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/users", users::router())
}
