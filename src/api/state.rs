//! API server state

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::handler::OrderHandler;

/// API server state
///
/// Built once at startup and shared read-only by every request.
#[derive(Clone)]
pub struct AppState {
    /// Order handler holding the store and metrics clients
    pub handler: Arc<OrderHandler>,

    /// Prometheus exporter, when the Prometheus sink is installed
    pub exporter: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(handler: Arc<OrderHandler>) -> Self {
        Self {
            handler,
            exporter: None,
        }
    }

    pub fn with_exporter(mut self, exporter: Option<PrometheusHandle>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Describe the backing store
    pub fn storage_description(&self) -> String {
        self.handler.store().describe()
    }
}
