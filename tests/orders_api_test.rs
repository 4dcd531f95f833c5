mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use test_case::test_case;
use uuid::Uuid;

use common::{order_payload, TestApp};

fn number_suffix(order: &Value) -> u64 {
    order["order_number"]
        .as_str()
        .and_then(|n| n.strip_prefix("#ORD"))
        .and_then(|n| n.parse().ok())
        .expect("order number")
}

#[tokio::test]
async fn create_returns_full_order() {
    let app = TestApp::new().await;

    let order = app.create_order("Ada", 149.99, "pending").await;

    assert!(Uuid::parse_str(order["id"].as_str().unwrap()).is_ok());
    assert_eq!(order["order_number"], "#ORD1001");
    assert_eq!(order["customer"]["name"], "Ada");
    assert_eq!(order["customer"]["email"], "ada@example.com");
    assert_eq!(order["customer"]["avatar"], "https://example.com/avatar.png");
    assert_eq!(order["order_date"], "2024-06-01");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "paid");
    assert_eq!(order["total_amount"].as_f64(), Some(149.99));
    assert_eq!(order["created_at"], order["updated_at"]);
}

#[tokio::test]
async fn order_numbers_increase_across_creates() {
    let app = TestApp::new().await;

    let mut previous = 0;
    for i in 0..5 {
        let order = app.create_order("Ada", 10.0 + i as f64, "pending").await;
        let n = number_suffix(&order);
        assert!(n > previous);
        previous = n;
    }
    assert_eq!(previous, 1005);
}

#[test_case(json!({"total_amount": 0}) ; "zero amount")]
#[test_case(json!({"total_amount": -5.5}) ; "negative amount")]
#[test_case(json!({"status": "shipped"}) ; "unknown status")]
#[test_case(json!({"payment_status": "partial"}) ; "unknown payment status")]
#[test_case(json!({"customer": {"name": "", "email": "x@example.com"}}) ; "empty customer name")]
#[test_case(json!({"customer": {"name": "Ada", "email": ""}}) ; "empty customer email")]
#[test_case(json!({"order_date": "June 1st"}) ; "malformed date")]
#[tokio::test]
async fn create_rejects_invalid_payloads(overrides: Value) {
    let app = TestApp::new().await;
    let mut payload = order_payload("Ada", 20.0, "pending");
    for (key, value) in overrides.as_object().unwrap() {
        payload[key] = value.clone();
    }

    let (status, body) = app.json(Method::POST, "/orders", Some(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["timestamp"].is_string());

    let (_, listing) = app.json(Method::GET, "/orders", None).await;
    assert_eq!(listing["total"], 0);
}

#[tokio::test]
async fn get_returns_order_or_not_found() {
    let app = TestApp::new().await;
    let order = app.create_order("Ada", 30.0, "completed").await;
    let id = order["id"].as_str().unwrap();

    let (status, fetched) = app.json(Method::GET, &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, order);

    let (status, body) = app
        .json(Method::GET, &format!("/orders/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");

    let (status, _) = app.json(Method::GET, "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_paginates_newest_first() {
    let app = TestApp::new().await;
    for i in 0..25 {
        app.create_order("Ada", 5.0 + i as f64, "pending").await;
    }

    let (status, page) = app.json(Method::GET, "/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 25);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 10);
    assert_eq!(page["total_pages"], 3);
    let orders = page["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 10);
    assert_eq!(orders[0]["order_number"], "#ORD1025");
    assert_eq!(orders[9]["order_number"], "#ORD1016");

    let (_, third) = app.json(Method::GET, "/orders?page=3&limit=10", None).await;
    assert_eq!(third["orders"].as_array().unwrap().len(), 5);

    let (_, beyond) = app.json(Method::GET, "/orders?page=4", None).await;
    assert!(beyond["orders"].as_array().unwrap().is_empty());
    assert_eq!(beyond["total"], 25);
}

#[tokio::test]
async fn list_filters_by_status() {
    let app = TestApp::new().await;
    for status in ["pending", "completed", "refunded", "completed"] {
        app.create_order("Ada", 12.0, status).await;
    }

    let (_, completed) = app.json(Method::GET, "/orders?status=completed", None).await;
    assert_eq!(completed["total"], 2);
    assert!(completed["orders"]
        .as_array()
        .unwrap()
        .iter()
        .all(|o| o["status"] == "completed"));

    let (_, all) = app.json(Method::GET, "/orders?status=all&limit=2", None).await;
    assert_eq!(all["total"], 4);
    assert_eq!(all["total_pages"], 2);
}

#[test_case("/orders?status=archived" ; "unknown status")]
#[test_case("/orders?page=0" ; "page zero")]
#[test_case("/orders?limit=0" ; "limit zero")]
#[test_case("/orders?page=-2" ; "negative page")]
#[test_case("/orders?page=9223372036854775807&limit=10" ; "page at i64 max")]
#[test_case("/orders?page=1000000000000000000&limit=10" ; "offset beyond i64")]
#[test_case("/orders?page=99999999999999999999" ; "page not an i64")]
#[tokio::test]
async fn list_rejects_bad_parameters(uri: &str) {
    let app = TestApp::new().await;
    let (status, _) = app.json(Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_caps_limit_at_configured_maximum() {
    let app = TestApp::with_config(|cfg| cfg.max_page_size = 3).await;
    for _ in 0..4 {
        app.create_order("Ada", 1.0, "pending").await;
    }

    let (status, page) = app.json(Method::GET, "/orders?limit=500", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["limit"], 3);
    assert_eq!(page["orders"].as_array().unwrap().len(), 3);
    assert_eq!(page["total_pages"], 2);
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let app = TestApp::new().await;
    let order = app.create_order("Ada", 40.0, "pending").await;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (status, updated) = app
        .json(
            Method::PUT,
            &uri,
            Some(json!({
                "status": "refunded",
                "total_amount": 35.5,
                "customer": {"name": "Grace", "email": "grace@example.com"}
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "refunded");
    assert_eq!(updated["total_amount"].as_f64(), Some(35.5));
    assert_eq!(updated["customer"]["name"], "Grace");
    assert_eq!(updated["customer"]["avatar"], Value::Null);
    assert_eq!(updated["payment_status"], order["payment_status"]);
    assert_eq!(updated["order_date"], order["order_date"]);
    assert_eq!(updated["order_number"], order["order_number"]);
    assert_eq!(updated["created_at"], order["created_at"]);
    assert_ne!(updated["updated_at"], order["updated_at"]);
}

#[tokio::test]
async fn update_rejects_empty_and_invalid_changes() {
    let app = TestApp::new().await;
    let order = app.create_order("Ada", 40.0, "pending").await;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (status, body) = app.json(Method::PUT, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("No fields to update"));

    let (status, _) = app
        .json(Method::PUT, &uri, Some(json!({"payment_status": "maybe"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::PUT, &uri, Some(json!({"total_amount": 0})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            Method::PUT,
            &format!("/orders/{}", Uuid::new_v4()),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, unchanged) = app.json(Method::GET, &uri, None).await;
    assert_eq!(unchanged, order);
}

#[tokio::test]
async fn delete_returns_no_content_then_not_found() {
    let app = TestApp::new().await;
    let order = app.create_order("Ada", 40.0, "pending").await;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (status, body) = app.json(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = app.json(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_then_duplicate_yields_distinct_copy() {
    let app = TestApp::new().await;
    let order = app.create_order("Ada", 99.5, "completed").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/orders/bulk/duplicate",
            Some(json!({"order_ids": [order["id"]]})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let copy_id = body["new_orders"][0]["id"].as_str().unwrap();

    let (_, copy) = app.json(Method::GET, &format!("/orders/{copy_id}"), None).await;
    assert_ne!(copy["id"], order["id"]);
    assert_ne!(copy["order_number"], order["order_number"]);
    assert!(number_suffix(&copy) > number_suffix(&order));
    assert_eq!(copy["customer"], order["customer"]);
    assert_eq!(copy["status"], order["status"]);
    assert_eq!(copy["total_amount"], order["total_amount"]);
    assert_eq!(copy["payment_status"], order["payment_status"]);
    assert_eq!(copy["order_date"], order["order_date"]);
}
