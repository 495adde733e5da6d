use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use storefront_api::app::{build_app, services::AppServices};
use storefront_core::{Money, ProductId};
use storefront_infra::InMemoryStore;

struct TestServer {
    base_url: String,
    store: InMemoryStore,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let store = InMemoryStore::new();
        let app = build_app(Arc::new(AppServices::new(Arc::new(store.clone()))));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    async fn product(&self, name: &str, cents: u64, stock: i32) -> ProductId {
        self.store
            .seed_product(name, None, Money::from_cents(cents), stock)
            .await
            .unwrap()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_user(client: &reqwest::Client, srv: &TestServer, name: &str) -> i64 {
    let res = client
        .post(srv.url("/users"))
        .json(&json!({
            "username": name,
            "email": format!("{name}@example.com"),
            "password_hash": "x",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn stock_of(client: &reqwest::Client, srv: &TestServer, id: ProductId) -> i64 {
    let body: serde_json::Value = client
        .get(srv.url(&format!("/products/{id}/stock")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["stock"].as_i64().unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_lookup_maps_errors() {
    let srv = TestServer::spawn().await;
    let id = srv.product("Kettle", 2500, 3).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["price"], "25.00");
    assert_eq!(body["items"][0]["stock_level"], "low");

    let res = client
        .get(srv.url(&format!("/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/products/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = client.get(srv.url("/products/999")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_user(&client, &srv, "ann").await;

    let res = client
        .post(srv.url("/users"))
        .json(&json!({ "username": "ann", "email": "other@example.com", "password_hash": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn cart_merge_remove_and_checkout() {
    let srv = TestServer::spawn().await;
    let p1 = srv.product("Pen", 150, 20).await;
    let p2 = srv.product("Pad", 300, 20).await;
    let client = reqwest::Client::new();
    let user = create_user(&client, &srv, "bob").await;
    let cart_url = srv.url(&format!("/cart/{user}"));

    for quantity in [3, 2] {
        let res = client
            .post(&cart_url)
            .json(&json!({ "product_id": p1.get(), "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }
    let res = client
        .post(&cart_url)
        .json(&json!({ "product_id": p2.get(), "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let cart: serde_json::Value = client.get(&cart_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 5);
    assert_eq!(cart["total"], "7.50");

    let res = client
        .delete(srv.url(&format!("/cart/{user}/{p2}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let res = client
        .post(srv.url(&format!("/cart/{user}/checkout")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(stock_of(&client, &srv, p1).await, 15);

    let cart: serde_json::Value = client.get(&cart_url).send().await.unwrap().json().await.unwrap();
    assert!(cart["items"].as_array().unwrap().is_empty());

    let res = client
        .post(srv.url(&format!("/cart/{user}/checkout")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(srv.url("/cart/4040")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_lifecycle_and_stock_errors() {
    let srv = TestServer::spawn().await;
    let p1 = srv.product("Chair", 4999, 5).await;
    let p2 = srv.product("Desk", 19900, 2).await;
    let client = reqwest::Client::new();
    let user = create_user(&client, &srv, "cy").await;

    // A short second line rejects the whole order.
    let res = client
        .post(srv.url("/orders"))
        .json(&json!({
            "user_id": user,
            "lines": [
                { "product_id": p1.get(), "quantity": 2, "price": "49.99" },
                { "product_id": p2.get(), "quantity": 1000000, "price": 199.0 },
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(stock_of(&client, &srv, p1).await, 5);

    let res = client
        .post(srv.url("/orders"))
        .json(&json!({
            "user_id": user,
            "lines": [{ "product_id": p1.get(), "quantity": 1, "price": "100000000.00" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_argument");

    let res = client
        .post(srv.url("/orders"))
        .json(&json!({
            "user_id": user,
            "lines": [{ "product_id": p1.get(), "quantity": 5, "price": "49.99" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    let res = client
        .post(srv.url("/orders"))
        .json(&json!({
            "user_id": user,
            "lines": [{ "product_id": p1.get(), "quantity": 1, "price": "49.99" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "out_of_stock");

    let order: serde_json::Value = client
        .get(srv.url(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(order["total"], "249.95");
    assert_eq!(order["status"], "pending");

    let res = client
        .patch(srv.url(&format!("/orders/{order_id}/status")))
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let views: serde_json::Value = client
        .get(srv.url(&format!("/users/{user}/orders")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(views["items"][0]["status"], "shipped");
    assert_eq!(views["items"][0]["product_name"], "Chair");

    let res = client
        .patch(srv.url("/orders/9999/status"))
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(stock_of(&client, &srv, p1).await, 5);

    let res = client
        .delete(srv.url(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reviews_validate_rating() {
    let srv = TestServer::spawn().await;
    let p = srv.product("Tent", 12000, 4).await;
    let client = reqwest::Client::new();
    let user = create_user(&client, &srv, "di").await;
    let url = srv.url(&format!("/products/{p}/reviews"));

    let res = client
        .post(&url)
        .json(&json!({ "user_id": user, "rating": 6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(&url)
        .json(&json!({ "user_id": user, "rating": 4, "comment": "roomy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: serde_json::Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["items"][0]["comment"], "roomy");
}
