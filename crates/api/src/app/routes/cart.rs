use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use storefront_core::{ProductId, UserId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/:user_id", get(get_cart).post(add_item).delete(clear_cart))
        .route("/:user_id/checkout", post(checkout))
        .route("/:user_id/:product_id", delete(remove_item))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cart.get_cart(user_id).await {
        Ok(lines) => (StatusCode::OK, Json(dto::cart_to_json(lines))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
    body: Result<Json<dto::AddCartItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .cart
        .add_item(user_id, ProductId::new(body.product_id), body.quantity)
        .await
    {
        Ok(item) => (StatusCode::ACCEPTED, Json(dto::cart_item_to_json(item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cart.clear_cart(user_id).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match errors::parse_id(&product_id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cart.remove_item(user_id, product_id).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match errors::parse_id(&user_id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.orders.checkout(user_id).await {
        Ok(order_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": order_id })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
