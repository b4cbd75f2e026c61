use std::sync::Arc;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use agrimart_api::{app, state::{AppState, AuthConfig}};
use agrimart_store::app_config::BusinessRules;
use agrimart_store::MemoryStore;

const PASSWORD: &str = "kharif-season-26";

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            AuthConfig { secret: "integration-secret".to_string(), expiration: 3600 },
            BusinessRules::default(),
        )
        .unwrap();
        Self { router: app(state.clone()), state }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, role: &str, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(json!({ "name": email, "email": email, "role": role, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", email, body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Lists a product, buys one unit, ships it to the customer and files
    /// a complaint on it. Returns the complaint id.
    async fn open_complaint(&self, buyer: &str, seller: &str, logistics: &str) -> String {
        let (_, product) = self
            .call(
                Method::POST,
                "/v1/products",
                Some(seller),
                Some(json!({ "name": "Mangoes", "category": "fruits", "unit": "dozen", "price": 200, "stock": 3 })),
            )
            .await;
        self.call(Method::POST, "/v1/account/funds", Some(buyer), Some(json!({ "amount": 200 }))).await;
        let (_, order) = self
            .call(
                Method::POST,
                "/v1/orders",
                Some(buyer),
                Some(json!({ "product_id": product["id"], "quantity": 1 })),
            )
            .await;
        let order_id = order["id"].as_str().unwrap().to_string();
        let status_uri = format!("/v1/orders/{}/status", order_id);
        for (token, next) in [
            (seller, "confirmed"),
            (seller, "dispatched_to_logistics"),
            (logistics, "dispatched_to_customer"),
        ] {
            let (status, body) = self
                .call(Method::POST, &status_uri, Some(token), Some(json!({ "status": next })))
                .await;
            assert_eq!(status, StatusCode::OK, "{}: {}", next, body);
        }

        let (status, complaint) = self
            .call(
                Method::POST,
                "/v1/complaints",
                Some(buyer),
                Some(json!({ "order_id": order_id, "reason": "spoiled", "description": "Overripe on arrival" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", complaint);
        complaint["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = app.call(Method::GET, "/v1/orders", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_flow_and_status_codes() {
    let app = TestApp::new();
    let buyer = app.register("buyer", "meera@example.in").await;
    let seller = app.register("seller", "ravi@farm.in").await;
    let driver = app.register("driver", "sunil@logistics.in").await;

    let (status, product) = app
        .call(
            Method::POST,
            "/v1/products",
            Some(&seller),
            Some(json!({ "name": "Tomatoes", "category": "vegetables", "price": 200, "stock": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = product["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(Method::POST, "/v1/account/funds", Some(&buyer), Some(json!({ "amount": 500 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, order) = app
        .call(
            Method::POST,
            "/v1/orders",
            Some(&buyer),
            Some(json!({ "product_id": product_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], 400);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, balance) = app.call(Method::GET, "/v1/account/balance", Some(&buyer), None).await;
    assert_eq!(balance["balance"], 100);
    assert_eq!(balance["currency"], "INR");

    // 100 left, one more unit costs 200
    let (status, body) = app
        .call(
            Method::POST,
            "/v1/orders",
            Some(&buyer),
            Some(json!({ "product_id": product_id, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "insufficient_funds");

    let status_uri = format!("/v1/orders/{}/status", order_id);
    let (status, _) = app
        .call(Method::POST, &status_uri, Some(&driver), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::POST, &status_uri, Some(&seller), Some(json!({ "status": "delivered" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, confirmed) = app
        .call(Method::POST, &status_uri, Some(&seller), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, _) = app
        .call(Method::POST, &format!("/v1/orders/{}/cancel", order_id), Some(&buyer), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, transactions) = app.call(Method::GET, "/v1/account/transactions", Some(&buyer), None).await;
    let kinds: Vec<&str> = transactions
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["product_purchase", "fund_addition"]);
}

#[tokio::test]
async fn test_cancel_restores_balances() {
    let app = TestApp::new();
    let buyer = app.register("buyer", "anil@example.in").await;
    let seller = app.register("seller", "kiran@farm.in").await;

    let (_, product) = app
        .call(
            Method::POST,
            "/v1/products",
            Some(&seller),
            Some(json!({ "name": "Toor Dal", "category": "pulses", "price": 200, "stock": 5 })),
        )
        .await;
    app.call(Method::POST, "/v1/account/funds", Some(&buyer), Some(json!({ "amount": 500 }))).await;
    let (_, order) = app
        .call(
            Method::POST,
            "/v1/orders",
            Some(&buyer),
            Some(json!({ "product_id": product["id"], "quantity": 2 })),
        )
        .await;

    let (status, cancelled) = app
        .call(Method::POST, &format!("/v1/orders/{}/cancel", order["id"].as_str().unwrap()), Some(&buyer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (_, buyer_balance) = app.call(Method::GET, "/v1/account/balance", Some(&buyer), None).await;
    let (_, seller_balance) = app.call(Method::GET, "/v1/account/balance", Some(&seller), None).await;
    assert_eq!(buyer_balance["balance"], 500);
    assert_eq!(seller_balance["balance"], 0);

    let (_, restocked) = app
        .call(Method::GET, &format!("/v1/products/{}", product["id"].as_str().unwrap()), Some(&buyer), None)
        .await;
    assert_eq!(restocked["stock"], 5);
}

#[tokio::test]
async fn test_admin_cannot_self_register() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "name": "Eve", "email": "eve@example.in", "role": "admin", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_token_needs_matching_password() {
    let app = TestApp::new();
    app.register("buyer", "nisha@example.in").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/token",
            None,
            Some(json!({ "email": "nisha@example.in", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "buyer");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/token",
            None,
            Some(json!({ "email": "nisha@example.in", "password": "guessing-game" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_admin_email_alone_gets_no_token() {
    let app = TestApp::new();
    app.state.market.users.bootstrap_admin("Ops", "ops@agrimart.in", None).await.unwrap();

    let (status, _) = app
        .call(Method::POST, "/v1/auth/token", None, Some(json!({ "email": "ops@agrimart.in" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // no admin password configured means no admin login at all
    for password in ["", "ops@agrimart.in", PASSWORD] {
        let (status, body) = app
            .call(
                Method::POST,
                "/v1/auth/token",
                None,
                Some(json!({ "email": "ops@agrimart.in", "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());
    }
}

#[tokio::test]
async fn test_reconcile_is_admin_only() {
    let app = TestApp::new();
    let buyer = app.register("buyer", "lata@example.in").await;
    app.call(Method::POST, "/v1/account/funds", Some(&buyer), Some(json!({ "amount": 250 }))).await;

    let (status, _) = app.call(Method::GET, "/v1/admin/reconcile", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.state
        .market
        .users
        .bootstrap_admin("Ops", "ops@agrimart.in", Some("ops-desk-password"))
        .await
        .unwrap();
    let (status, token) = app
        .call(
            Method::POST,
            "/v1/auth/token",
            None,
            Some(json!({ "email": "ops@agrimart.in", "password": "ops-desk-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let admin = token["token"].as_str().unwrap().to_string();

    let (status, report) = app.call(Method::GET, "/v1/admin/reconcile", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["mismatches"], 0);
    assert_eq!(report["accounts"], 1);
}

#[tokio::test]
async fn test_claim_without_policy_is_unprocessable() {
    let app = TestApp::new();
    let buyer = app.register("buyer", "geeta@example.in").await;
    let seller = app.register("seller", "mohan@farm.in").await;
    let logistics = app.register("logistics", "fleet@logistics.in").await;
    let complaint_id = app.open_complaint(&buyer, &seller, &logistics).await;

    let (status, body) = app
        .call(Method::POST, &format!("/v1/complaints/{}/claim", complaint_id), Some(&seller), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_active_policy");
}

#[tokio::test]
async fn test_complaint_cancel_body_is_optional() {
    let app = TestApp::new();
    let buyer = app.register("buyer", "farida@example.in").await;
    let seller = app.register("seller", "joseph@farm.in").await;
    let logistics = app.register("logistics", "dispatch@logistics.in").await;

    let complaint_id = app.open_complaint(&buyer, &seller, &logistics).await;
    let (status, cancelled) = app
        .call(Method::POST, &format!("/v1/complaints/{}/cancel", complaint_id), Some(&buyer), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", cancelled);
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["cancellation_reason"].is_null());

    let complaint_id = app.open_complaint(&buyer, &seller, &logistics).await;
    let (status, cancelled) = app
        .call(
            Method::POST,
            &format!("/v1/complaints/{}/cancel", complaint_id),
            Some(&buyer),
            Some(json!({ "reason": "Seller replaced the sacks" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["cancellation_reason"], "Seller replaced the sacks");
}

#[tokio::test]
async fn test_metrics_count_orders() {
    let app = TestApp::new();
    let buyer = app.register("buyer", "usha@example.in").await;
    let seller = app.register("seller", "gopal@farm.in").await;
    let (_, product) = app
        .call(
            Method::POST,
            "/v1/products",
            Some(&seller),
            Some(json!({ "name": "Milk", "category": "dairy", "unit": "litre", "price": 60, "stock": 100 })),
        )
        .await;
    app.call(Method::POST, "/v1/account/funds", Some(&buyer), Some(json!({ "amount": 120 }))).await;
    app.call(
        Method::POST,
        "/v1/orders",
        Some(&buyer),
        Some(json!({ "product_id": product["id"], "quantity": 2 })),
    )
    .await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("agrimart_orders_placed_total 1"));
    assert!(text.contains("agrimart_funds_added_total 1"));
}
