#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use order_desk::{config::AppConfig, db, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

/// Helper harness for spinning up the application over a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut cfg = AppConfig {
            database_url: format!(
                "sqlite://{}?mode=rwc",
                dir.path().join("orders_test.db").display()
            ),
            environment: "test".to_string(),
            ..AppConfig::default()
        };
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        Self {
            router: order_desk::app(state.clone()),
            state,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        send(self.router(), method, uri, body).await
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Create an order through the API and return its JSON.
    pub async fn create_order(&self, name: &str, amount: f64, status: &str) -> Value {
        let (code, body) = self
            .json(Method::POST, "/orders", Some(order_payload(name, amount, status)))
            .await;
        assert_eq!(code, StatusCode::CREATED, "create failed: {body}");
        body
    }
}

pub fn order_payload(name: &str, amount: f64, status: &str) -> Value {
    json!({
        "customer": {
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "avatar": "https://example.com/avatar.png"
        },
        "total_amount": amount,
        "status": status,
        "payment_status": "paid",
        "order_date": "2024-06-01"
    })
}

pub async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = if let Some(json) = body {
        builder = builder.header("content-type", "application/json");
        Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
    } else {
        Body::empty()
    };

    let request = builder.body(body).expect("failed to build request");
    router
        .oneshot(request)
        .await
        .expect("router error during test request")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse response body")
    }
}
