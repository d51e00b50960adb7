//! End-to-end tests for the order handler against in-process collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use foodorders::handler::OrderHandler;
use foodorders::metrics::{DisabledSink, MemorySink};
use foodorders::storage::local::LocalStore;
use foodorders::storage::memory::MemoryStore;
use foodorders::storage::OrderStore;
use foodorders::types::{Order, RequestEvent, ResponseEnvelope};
use foodorders::{Error, Result};
use serde_json::Value;
use tempfile::TempDir;

fn memory_handler() -> (OrderHandler, Arc<MemoryStore>, Arc<MemorySink>) {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(MemorySink::new());
    let handler = OrderHandler::new(store.clone(), sink.clone());
    (handler, store, sink)
}

fn create(body: &str) -> RequestEvent {
    RequestEvent::new("POST").with_body(body)
}

fn fetch(order_id: &str) -> RequestEvent {
    RequestEvent::new("GET").with_query("orderId", order_id)
}

fn body_json(response: &ResponseEnvelope) -> Value {
    serde_json::from_str(&response.body).unwrap()
}

fn assert_cors(response: &ResponseEnvelope) {
    assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(
        response.header("Access-Control-Allow-Headers"),
        Some("Content-Type,X-Amz-Date,Authorization,X-Api-Key")
    );
    assert_eq!(
        response.header("Access-Control-Allow-Methods"),
        Some("OPTIONS,POST,GET")
    );
}

/// Store whose every operation fails
struct BrokenStore;

#[async_trait]
impl OrderStore for BrokenStore {
    async fn put(&self, _order: &Order) -> Result<()> {
        Err(Error::storage("table unavailable"))
    }

    async fn get(&self, _order_id: &str) -> Result<Option<Order>> {
        Err(Error::storage("table unavailable"))
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

#[tokio::test]
async fn test_create_then_fetch() {
    let (handler, _store, sink) = memory_handler();

    let response = handler
        .handle(create(r#"{"orderId":"o1","item":"Pizza","price":12.5}"#))
        .await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"Order o1 for Pizza received.\"");
    assert_cors(&response);

    let response = handler.handle(fetch("o1")).await;
    assert_eq!(response.status_code, 200);
    assert_cors(&response);

    let record = body_json(&response);
    assert_eq!(record["orderId"], "o1");
    assert_eq!(record["item"], "Pizza");
    assert_eq!(record["price"], 12.5);
    let timestamp = record["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    let samples = sink.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].name, "OrderPrice");
    assert_eq!(samples[0].value, 12.5);
}

#[tokio::test]
async fn test_missing_price_defaults_to_zero() {
    let (handler, store, _sink) = memory_handler();

    let response = handler
        .handle(create(r#"{"orderId":"o2","item":"Soup"}"#))
        .await;
    assert_eq!(response.status_code, 200);

    let order = store.get("o2").await.unwrap().unwrap();
    assert_eq!(order.price, 0.0);

    let record = body_json(&handler.handle(fetch("o2")).await);
    assert_eq!(record["price"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn test_fetch_unknown_order_is_not_found() {
    let (handler, _store, _sink) = memory_handler();

    let response = handler.handle(fetch("missing")).await;
    assert_eq!(response.status_code, 404);
    assert_eq!(response.body, "\"Order not found\"");
    assert_cors(&response);
}

#[tokio::test]
async fn test_repeated_create_overwrites() {
    let (handler, store, _sink) = memory_handler();

    handler
        .handle(create(r#"{"orderId":"o1","item":"Pizza","price":12.5}"#))
        .await;
    handler
        .handle(create(r#"{"orderId":"o1","item":"Burger","price":8}"#))
        .await;

    let record = body_json(&handler.handle(fetch("o1")).await);
    assert_eq!(record["item"], "Burger");
    assert_eq!(record["price"], 8.0);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_preflight_ignores_body_and_query() {
    let (handler, store, sink) = memory_handler();

    let response = handler
        .handle(
            RequestEvent::new("OPTIONS")
                .with_body("not json at all")
                .with_query("orderId", "o1"),
        )
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"CORS preflight successful\"");
    assert_cors(&response);
    assert!(store.is_empty());
    assert!(sink.samples().is_empty());
}

#[tokio::test]
async fn test_unsupported_methods() {
    let (handler, _store, _sink) = memory_handler();

    for method in ["DELETE", "PUT", "PATCH", "HEAD", ""] {
        let response = handler.handle(RequestEvent::new(method)).await;
        assert_eq!(response.status_code, 400, "method {method:?}");
        assert_eq!(response.body, "\"Unsupported HTTP method\"");
        assert_cors(&response);
    }
}

#[tokio::test]
async fn test_malformed_input_is_internal_error() {
    let (handler, store, sink) = memory_handler();

    let cases = [
        create("{not json"),
        create(r#"{"item":"Pizza"}"#),
        create(r#"{"orderId":"o1","item":"Pizza","price":"cheap"}"#),
        RequestEvent::new("POST"),
        RequestEvent::new("GET"),
    ];

    for event in cases {
        let response = handler.handle(event).await;
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, "\"Internal server error\"");
        assert_cors(&response);
    }

    assert!(store.is_empty());
    assert!(sink.samples().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_generic_internal_error() {
    let handler = OrderHandler::new(Arc::new(BrokenStore), Arc::new(DisabledSink));

    let response = handler
        .handle(create(r#"{"orderId":"o1","item":"Pizza"}"#))
        .await;
    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, "\"Internal server error\"");
    assert!(!response.body.contains("unavailable"));
    assert_cors(&response);

    let response = handler.handle(fetch("o1")).await;
    assert_eq!(response.status_code, 500);
    assert_cors(&response);
}

#[tokio::test]
async fn test_metric_failure_does_not_fail_create() {
    let store = Arc::new(MemoryStore::new());
    let handler = OrderHandler::new(store.clone(), Arc::new(MemorySink::failing()));

    let response = handler
        .handle(create(r#"{"orderId":"o1","item":"Pizza","price":3}"#))
        .await;

    assert_eq!(response.status_code, 200);
    assert!(store.get("o1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_custom_price_metric_name() {
    let sink = Arc::new(MemorySink::new());
    let handler = OrderHandler::new(Arc::new(MemoryStore::new()), sink.clone())
        .with_price_metric("BasketValue");

    handler
        .handle(create(r#"{"orderId":"o9","item":"Cake","price":4.25}"#))
        .await;

    let samples = sink.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].name, "BasketValue");
}

#[tokio::test]
async fn test_handler_over_local_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(LocalStore::new(temp_dir.path(), "FoodOrders").unwrap());
    let handler = OrderHandler::new(store, Arc::new(DisabledSink));

    let response = handler
        .handle(create(r#"{"orderId":"o/1","item":"Noodles","price":6.5}"#))
        .await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"Order o/1 for Noodles received.\"");

    let record = body_json(&handler.handle(fetch("o/1")).await);
    assert_eq!(record["item"], "Noodles");
    assert_eq!(record["price"], 6.5);
}
