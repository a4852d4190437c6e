// Integration tests for `InventoryClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stockline_api::models::{
    MovementType, NewStockMovement, ProductFilter, ProductStatus, VelocityFilter, VelocityPeriod,
};
use stockline_api::{
    Error, ErrorKind, InventoryClient, Method, QueryParams, RateLimitConfig, RateLimiter,
    RequestHistory, RequestOutcome,
};

// ── Helpers ─────────────────────────────────────────────────────────

const API_KEY: &str = "test-key";

fn client_for(server: &MockServer, timeout: Duration) -> (InventoryClient, Arc<RequestHistory>) {
    let history = Arc::new(RequestHistory::default());
    let client = InventoryClient::from_reqwest(
        &server.uri(),
        &SecretString::from(API_KEY),
        reqwest::Client::new(),
        timeout,
    )
    .unwrap()
    .with_request_log(history.clone());
    (client, history)
}

async fn setup() -> (MockServer, InventoryClient, Arc<RequestHistory>) {
    let server = MockServer::start().await;
    let (client, history) = client_for(&server, Duration::from_secs(30));
    (server, client, history)
}

fn product_json(id: &str, stock: u32) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Router WiFi TP-Link AC1200",
        "category": "Router",
        "sku": "TL-AC1200",
        "price": 450000.0,
        "stock": stock,
        "minStock": 20,
        "status": "in_stock",
        "lastUpdated": "2024-01-15T10:30:00Z"
    })
}

// ── Normalization ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_products_wrapped_page() {
    let (server, client, history) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("page", "2"))
        .and(query_param("status", "low_stock"))
        .and(header("X-API-Key", API_KEY))
        .and(header_exists("X-Rate-Limit-Remaining"))
        .and(header_exists("X-Rate-Limit-Reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "data": [product_json("prod-001", 75)],
                "total": 11,
                "page": 2,
                "limit": 10,
                "hasNext": false,
                "hasPrev": true
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = ProductFilter {
        page: Some(2),
        status: Some(ProductStatus::LowStock),
        ..ProductFilter::default()
    };
    let page = client.list_products(&filter).await.unwrap().into_data().unwrap();

    assert_eq!(page.total, 11);
    assert!(page.has_prev);
    assert_eq!(page.data[0].id, "prod-001");
    assert_eq!(page.data[0].stock, 75);

    let records = history.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].method, "GET");
    assert_eq!(records[0].endpoint, "/api/products");
    assert_eq!(records[0].outcome, RequestOutcome::Completed { status: 200 });
}

#[tokio::test]
async fn test_bare_body_is_wrapped() {
    let (server, client, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/inventory/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalProducts": 3,
            "totalValue": 1200.5,
            "lowStockCount": 1,
            "outOfStockCount": 0,
            "topProducts": []
        })))
        .mount(&server)
        .await;

    let env = client.inventory_stats().await.unwrap();
    assert!(env.success);
    let stats = env.into_data().unwrap();
    assert_eq!(stats.total_products, 3);
    assert_eq!(stats.low_stock_count, 1);
}

#[tokio::test]
async fn test_unsuccessful_envelope_passes_through() {
    let (server, client, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/inventory/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "alerts service unavailable"
        })))
        .mount(&server)
        .await;

    let env = client.stock_alerts().await.unwrap();
    assert!(!env.success);
    assert_eq!(env.data, None);

    let err = env.into_data().unwrap_err();
    assert!(matches!(err, Error::Api { ref message } if message == "alerts service unavailable"));
}

#[tokio::test]
async fn test_not_found_is_http_error() {
    let (server, client, history) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/products/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("product not found"))
        .mount(&server)
        .await;

    let err = client.get_product("missing").await.unwrap_err();
    match &err {
        Error::Http { status, body } => {
            assert_eq!(*status, 404);
            assert_eq!(body, "product not found");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
    assert!(err.is_not_found());

    let records = history.records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].outcome,
        RequestOutcome::Failed {
            kind: ErrorKind::Http,
            status: Some(404)
        }
    );
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let (server, client, history) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/inventory/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client.inventory_stats().await.unwrap_err();
    match err {
        Error::Parse { body, .. } => assert_eq!(body, "<html>gateway</html>"),
        other => panic!("expected Parse error, got: {other:?}"),
    }
    assert_eq!(
        history.records()[0].outcome,
        RequestOutcome::Failed {
            kind: ErrorKind::Parse,
            status: Some(200)
        }
    );
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let (server, client, _) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/products/prod-009"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let env = client.delete_product("prod-009").await.unwrap();
    assert!(env.success);
}

// ── Request shaping ─────────────────────────────────────────────────

#[tokio::test]
async fn test_record_movement_sends_body() {
    let (server, client, _) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/inventory/movements"))
        .and(body_json(json!({
            "productId": "prod-001",
            "type": "IN",
            "quantity": 50,
            "reason": "Purchase Order Received",
            "location": "Warehouse A",
            "reference": "PO-2024-001"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {
                "id": "mov-100",
                "productId": "prod-001",
                "type": "IN",
                "quantity": 50,
                "reason": "Purchase Order Received"
            },
            "message": "Movement recorded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let movement = NewStockMovement {
        product_id: "prod-001".into(),
        movement_type: MovementType::In,
        quantity: 50,
        reason: "Purchase Order Received".into(),
        location: "Warehouse A".into(),
        reference: Some("PO-2024-001".into()),
        notes: None,
    };
    let env = client.record_stock_movement(&movement).await.unwrap();
    assert_eq!(env.message.as_deref(), Some("Movement recorded"));
    assert_eq!(env.into_data().unwrap().id, "mov-100");
}

#[tokio::test]
async fn test_list_filters_repeat_and_omit_keys() {
    let (server, client, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/velocity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let filter = VelocityFilter {
        period: Some(VelocityPeriod::Month),
        product_ids: vec!["prod-001".into(), "prod-002".into()],
    };
    let rows = client.velocity_analysis(&filter).await.unwrap().into_data().unwrap();
    assert!(rows.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url.query(),
        Some("period=month&productIds=prod-001&productIds=prod-002")
    );
}

#[tokio::test]
async fn test_empty_filter_sends_no_query() {
    let (server, client, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    client.list_products(&ProductFilter::default()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

// ── Rejections before I/O ───────────────────────────────────────────

#[tokio::test]
async fn test_invalid_endpoint_rejected_without_io() {
    let (server, client, history) = setup().await;

    let err = client
        .request::<serde_json::Value>(Method::GET, "api/products", &QueryParams::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    let err = client.get_product("  ").await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    assert!(server.received_requests().await.unwrap().is_empty());
    let records = history.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| matches!(
        r.outcome,
        RequestOutcome::Failed {
            kind: ErrorKind::Validation,
            ..
        }
    )));
}

#[tokio::test]
async fn test_rate_limit_rejects_without_network_call() {
    let server = MockServer::start().await;
    let (client, history) = client_for(&server, Duration::from_secs(30));
    let client = client.with_rate_limiter(Arc::new(RateLimiter::new(RateLimitConfig {
        limit: 2,
        window: Duration::from_secs(3600),
    })));

    Mock::given(method("GET"))
        .and(path("/api/inventory/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    client.stock_alerts().await.unwrap();
    client.stock_alerts().await.unwrap();
    let err = client.stock_alerts().await.unwrap_err();

    match err {
        Error::RateLimited { retry_after_secs } => assert!(retry_after_secs <= 3600),
        other => panic!("expected RateLimited, got: {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    let summary = history.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.rate_limited, 1);
    assert_eq!(history.records()[2].outcome.status_code(), 429);
}

// ── Timeout ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    let (client, history) = client_for(&server, Duration::from_millis(200));

    Mock::given(method("GET"))
        .and(path("/api/inventory/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "totalProducts": 0 }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.inventory_stats().await.unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_secs: 1 }));
    assert!(err.is_transient());
    assert_eq!(
        history.records()[0].outcome,
        RequestOutcome::Failed {
            kind: ErrorKind::Timeout,
            status: Some(408)
        }
    );
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let history = Arc::new(RequestHistory::default());
    let client = InventoryClient::from_reqwest(
        &uri,
        &SecretString::from(API_KEY),
        reqwest::Client::new(),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_request_log(history.clone());

    let err = client.supplier_performance().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(history.len(), 1);
}
