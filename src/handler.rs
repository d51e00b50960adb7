//! Order request handler
//!
//! Dispatches a request event on its method, performs at most one store
//! operation and wraps the outcome in a CORS-enabled response envelope.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::metrics::{MetricSample, MetricUnit, MetricsSink};
use crate::storage::OrderStore;
use crate::types::{CreateOrderRequest, Order, RequestEvent, ResponseEnvelope};
use crate::{Error, Result};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "Content-Type,X-Amz-Date,Authorization,X-Api-Key";
pub const ALLOW_METHODS: &str = "OPTIONS,POST,GET";

pub const PREFLIGHT_MESSAGE: &str = "CORS preflight successful";
pub const NOT_FOUND_MESSAGE: &str = "Order not found";
pub const UNSUPPORTED_METHOD_MESSAGE: &str = "Unsupported HTTP method";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub const DEFAULT_PRICE_METRIC: &str = "OrderPrice";

/// What a request asks the handler to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Preflight,
    Create,
    Fetch,
    Unsupported,
}

impl Action {
    pub fn from_method(method: &str) -> Self {
        match method.trim().to_ascii_uppercase().as_str() {
            "OPTIONS" => Action::Preflight,
            "POST" => Action::Create,
            "GET" => Action::Fetch,
            _ => Action::Unsupported,
        }
    }
}

/// Wrap a status code and payload with the fixed CORS headers.
pub fn build_response<T: Serialize + ?Sized>(status_code: u16, body: &T) -> ResponseEnvelope {
    match serde_json::to_string(body) {
        Ok(body) => envelope(status_code, body),
        Err(err) => {
            tracing::error!(error = %err, status_code, "failed to serialize response body");
            envelope(500, format!("\"{}\"", INTERNAL_ERROR_MESSAGE))
        }
    }
}

fn envelope(status_code: u16, body: String) -> ResponseEnvelope {
    let headers = BTreeMap::from([
        (
            "Access-Control-Allow-Origin".to_string(),
            ALLOW_ORIGIN.to_string(),
        ),
        (
            "Access-Control-Allow-Headers".to_string(),
            ALLOW_HEADERS.to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            ALLOW_METHODS.to_string(),
        ),
    ]);

    ResponseEnvelope {
        status_code,
        headers,
        body,
    }
}

/// Request handler shared across all requests
pub struct OrderHandler {
    store: Arc<dyn OrderStore>,
    metrics: Arc<dyn MetricsSink>,
    price_metric: String,
}

impl OrderHandler {
    pub fn new(store: Arc<dyn OrderStore>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            store,
            metrics,
            price_metric: DEFAULT_PRICE_METRIC.to_string(),
        }
    }

    pub fn with_price_metric(mut self, name: impl Into<String>) -> Self {
        self.price_metric = name.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Handle one request event. Never fails: every outcome is an envelope.
    pub async fn handle(&self, event: RequestEvent) -> ResponseEnvelope {
        let request_id = event
            .request_id()
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = tracing::info_span!(
            "order_request",
            %request_id,
            method = %event.http_method,
        );

        self.dispatch(event).instrument(span).await
    }

    async fn dispatch(&self, event: RequestEvent) -> ResponseEnvelope {
        match Action::from_method(&event.http_method) {
            Action::Preflight => build_response(200, PREFLIGHT_MESSAGE),
            Action::Create => match self.create(&event).await {
                Ok(order) => build_response(
                    200,
                    &format!("Order {} for {} received.", order.order_id, order.item),
                ),
                Err(err) => internal_error(err),
            },
            Action::Fetch => match self.fetch(&event).await {
                Ok(Some(order)) => build_response(200, &order),
                Ok(None) => build_response(404, NOT_FOUND_MESSAGE),
                Err(err) => internal_error(err),
            },
            Action::Unsupported => {
                tracing::debug!("rejecting unsupported method");
                build_response(400, UNSUPPORTED_METHOD_MESSAGE)
            }
        }
    }

    async fn create(&self, event: &RequestEvent) -> Result<Order> {
        let body = event
            .body
            .as_deref()
            .ok_or_else(|| Error::invalid_request("missing request body"))?;
        let request: CreateOrderRequest = serde_json::from_str(body)?;
        let order = request.into_order();

        self.store.put(&order).await?;
        tracing::info!(order_id = %order.order_id, item = %order.item, "order stored");

        self.record_price(&order).await;
        Ok(order)
    }

    async fn fetch(&self, event: &RequestEvent) -> Result<Option<Order>> {
        let order_id = event
            .query("orderId")
            .ok_or_else(|| Error::invalid_request("missing query parameter 'orderId'"))?;

        let order = self.store.get(order_id).await?;
        if order.is_none() {
            tracing::info!(%order_id, "order not found");
        }
        Ok(order)
    }

    async fn record_price(&self, order: &Order) {
        let sample = MetricSample::new(&self.price_metric, order.price, MetricUnit::None);
        if let Err(err) = self.metrics.record(sample).await {
            tracing::warn!(
                error = %err,
                order_id = %order.order_id,
                "failed to record price metric"
            );
        }
    }
}

/// Log the cause and answer with the generic 500 envelope.
pub fn internal_error(err: Error) -> ResponseEnvelope {
    tracing::error!(error = %err, "request failed");
    build_response(500, INTERNAL_ERROR_MESSAGE)
}
