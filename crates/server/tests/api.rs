//! End-to-end API tests against the in-memory store.
//!
//! Each test builds the full router, including middleware, and drives it
//! with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use shopkeep_core::{OrderId, OrderStatus, ProductId, Role};
use shopkeep_server::auth::TokenService;
use shopkeep_server::config::OrderConfig;
use shopkeep_server::db::{CustomerStore, MemoryStore, OrderStore, Stores};
use shopkeep_server::models::OrderUpdate;
use shopkeep_server::services::{AccountService, RandomTrackingCodes, Registration};
use shopkeep_server::state::AppState;

const SECRET: &str = "t8#Lq2!Vz9$Wm4^Rk7&Hp1*Nx6@Bc3%Y";

struct TestApp {
    app: Router,
    state: AppState,
    memory: MemoryStore,
}

impl TestApp {
    fn new() -> Self {
        let memory = MemoryStore::new();
        let state = AppState::from_parts(
            OrderConfig::default(),
            Stores::memory(memory.clone()),
            TokenService::new(&SecretString::from(SECRET), Duration::from_secs(3600)),
            Arc::new(RandomTrackingCodes::new("TH")),
        );
        Self {
            app: shopkeep_server::build_app(state.clone()),
            state,
            memory,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Create an account directly and return a token for it.
    async fn account(&self, username: &str, role: Role) -> String {
        let users = self.state.stores().users.as_ref();
        let accounts = AccountService::new(users, Duration::from_secs(5));
        accounts
            .register(
                Registration {
                    username: username.to_string(),
                    email: format!("{username}@shop.test"),
                    password: "correct horse".to_string(),
                },
                role,
            )
            .await
            .unwrap();
        accounts
            .login(
                self.state.tokens(),
                &format!("{username}@shop.test"),
                "correct horse",
            )
            .await
            .unwrap()
    }

    async fn create_product(&self, token: &str, sku: &str, price: &str, stock: i64) -> ProductId {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/product",
                Some(token),
                Some(json!({
                    "product_name": format!("Product {sku}"),
                    "sku": sku,
                    "price": price,
                    "stock": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ProductId::new(i32::try_from(body["product"]["id"].as_i64().unwrap()).unwrap())
    }
}

fn order_body(product_id: ProductId, quantity: i64) -> Value {
    json!({
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "customer_fullname": "Nok Saetang",
        "customer_email": "nok@mail.test",
        "customer_phone": "0812345678",
        "customer_address": "12 Soi Ari, Bangkok",
    })
}

#[tokio::test]
async fn test_register_and_login_over_http() {
    let t = TestApp::new();
    let credentials = json!({
        "username": "somchai",
        "email": "somchai@shop.test",
        "password": "hunter22",
    });

    let (status, body) = t
        .request(Method::POST, "/api/auth/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "Staff");

    let (status, body) = t
        .request(Method::POST, "/api/auth/register", None, Some(credentials))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "somchai@shop.test", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid email or password");

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "somchai@shop.test", "password": "hunter22" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, _) = t.request(Method::GET, "/api/order", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let t = TestApp::new();
    let (status, body) = t.request(Method::GET, "/api/order", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthenticated");

    let (status, _) = t
        .request(Method::GET, "/api/customer", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_order_debits_stock() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let product = t.create_product(&s1, "SKU1", "9.99", 10).await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/public/order",
            None,
            Some(order_body(product, 3)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["order"]["total_amount"], "29.97");
    assert_eq!(body["order"]["created_by"], Value::Null);
    assert_eq!(body["order"]["tracking_number"], Value::Null);
    assert_eq!(body["order"]["status"], "Pending");
    assert_eq!(t.memory.product(product).unwrap().stock, 7);
}

#[tokio::test]
async fn test_insufficient_stock_changes_nothing() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let product = t.create_product(&s1, "SKU1", "9.99", 10).await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/public/order",
            None,
            Some(order_body(product, 15)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InsufficientStock");
    assert!(body["message"].as_str().unwrap().contains("Product SKU1"));
    assert_eq!(t.memory.product(product).unwrap().stock, 10);
    assert_eq!(t.memory.order_count(), 0);
}

#[tokio::test]
async fn test_product_delete_is_owner_scoped() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let s2 = t.account("s2", Role::Staff).await;
    let admin = t.account("boss", Role::Admin).await;
    let product = t.create_product(&s1, "P1", "5.00", 1).await;
    let uri = format!("/api/product?id={product}");

    let (status, body) = t.request(Method::DELETE, &uri, Some(s2.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");

    let (status, body) = t.request(Method::DELETE, &uri, Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");
}

#[tokio::test]
async fn test_completed_order_cannot_be_updated() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let product = t.create_product(&s1, "SKU1", "9.99", 10).await;
    let (_, placed) = t
        .request(Method::POST, "/api/order", Some(s1.as_str()), Some(order_body(product, 1)))
        .await;
    let order_id = placed["order"]["id"].as_i64().unwrap();
    assert!(placed["order"]["tracking_number"].as_str().unwrap().starts_with("TH"));

    let uri = format!("/api/order?id={order_id}");
    let (status, _) = t
        .request(
            Method::PUT,
            &uri,
            Some(s1.as_str()),
            Some(json!({ "status": "Completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    for status_name in ["Pending", "Processing", "Cancelled", "Completed"] {
        let (status, body) = t
            .request(
                Method::PUT,
                &uri,
                Some(s1.as_str()),
                Some(json!({ "status": status_name, "note": "again" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    }

    let stored = t
        .memory
        .find_by_id(OrderId::new(i32::try_from(order_id).unwrap()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status.as_str(), "Completed");
    assert_eq!(stored.note, "In progress");
}

#[tokio::test]
async fn test_unknown_status_is_rejected() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let (status, body) = t
        .request(
            Method::PUT,
            "/api/order?id=1",
            Some(s1.as_str()),
            Some(json!({ "status": "Lost" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_order_listing_is_role_scoped() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let s2 = t.account("s2", Role::Staff).await;
    let admin = t.account("boss", Role::Admin).await;
    let product = t.create_product(&s1, "SKU1", "1.00", 100).await;

    for (token, path) in [
        (Some(s1.as_str()), "/api/order"),
        (Some(s2.as_str()), "/api/order"),
        (None, "/api/public/order"),
    ] {
        let (status, _) = t
            .request(Method::POST, path, token, Some(order_body(product, 1)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let count = |value: &Value| value.as_array().unwrap().len();
    let (_, all) = t.request(Method::GET, "/api/order", Some(admin.as_str()), None).await;
    let (_, mine) = t.request(Method::GET, "/api/order", Some(s1.as_str()), None).await;
    assert_eq!(count(&all), 3);
    assert_eq!(count(&mine), 1);

    let (_, customers) = t.request(Method::GET, "/api/customer", Some(s2.as_str()), None).await;
    assert_eq!(count(&customers), 1);
}

#[tokio::test]
async fn test_price_change_does_not_touch_placed_orders() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let product = t.create_product(&s1, "SKU1", "2.50", 10).await;
    let (_, placed) = t
        .request(Method::POST, "/api/order", Some(s1.as_str()), Some(order_body(product, 2)))
        .await;
    let order_id = i32::try_from(placed["order"]["id"].as_i64().unwrap()).unwrap();

    let (status, _) = t
        .request(
            Method::PUT,
            &format!("/api/product?id={product}"),
            Some(s1.as_str()),
            Some(json!({ "price": "4.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let order = t
        .memory
        .find_by_id(OrderId::new(order_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.total_amount.to_string(), "5.00");
    assert_eq!(order.items[0].unit_price.to_string(), "2.50");
}

#[tokio::test]
async fn test_errors_use_json_shape() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;

    let (status, body) = t
        .request(Method::DELETE, "/api/order", Some(s1.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing order ID");

    let (status, body) = t
        .request(
            Method::POST,
            "/api/public/order",
            None,
            Some(json!({ "items": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_health_and_ping() {
    let t = TestApp::new();
    let (status, _) = t.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.request(Method::GET, "/api/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn test_cancelled_order_cannot_be_reopened() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let product = t.create_product(&s1, "SKU1", "1.00", 5).await;
    let (_, placed) = t
        .request(Method::POST, "/api/order", Some(s1.as_str()), Some(order_body(product, 1)))
        .await;
    let id = OrderId::new(i32::try_from(placed["order"]["id"].as_i64().unwrap()).unwrap());

    let cancel = OrderUpdate {
        status: OrderStatus::Cancelled,
        note: None,
        tracking_number: None,
    };
    OrderStore::update(&t.memory, id, &cancel).await.unwrap();
    let (status, _) = t
        .request(
            Method::PUT,
            &format!("/api/order?id={id}"),
            Some(s1.as_str()),
            Some(json!({ "status": "Shipped" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_amounts_past_the_cap_are_rejected() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/product",
            Some(s1.as_str()),
            Some(json!({
                "product_name": "Gold bar",
                "sku": "GOLD-HUGE",
                "price": "10000000000.00",
                "stock": 5,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let product = t.create_product(&s1, "GOLD", "9999999999.99", 5).await;
    let (status, body) = t
        .request(
            Method::POST,
            "/api/public/order",
            None,
            Some(order_body(product, 2)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "ValidationError");
    assert_eq!(t.memory.product(product).unwrap().stock, 5);
    assert_eq!(t.memory.order_count(), 0);
    assert!(CustomerStore::list_all(&t.memory).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_product_update_is_rejected() {
    let t = TestApp::new();
    let s1 = t.account("s1", Role::Staff).await;
    let product = t.create_product(&s1, "SKU1", "2.50", 10).await;

    let (status, body) = t
        .request(
            Method::PUT,
            &format!("/api/product?id={product}"),
            Some(s1.as_str()),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert_eq!(body["message"], "no product fields to update");
}
