//! Metrics sinks
//!
//! The handler emits one sample per stored order. Sinks are fallible, but
//! callers treat a failed sample as a warning, never as a request failure.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::{Error, Result};

/// Unit attached to a sample. Prices are unitless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    None,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::None => "none",
        }
    }
}

/// A single named numeric observation
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: f64, unit: MetricUnit) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record(&self, sample: MetricSample) -> Result<()>;
}

/// Sink that drops every sample
pub struct DisabledSink;

#[async_trait]
impl MetricsSink for DisabledSink {
    async fn record(&self, _sample: MetricSample) -> Result<()> {
        Ok(())
    }
}

/// Sink forwarding samples to the global `metrics` recorder
pub struct PrometheusSink {
    namespace: String,
}

impl PrometheusSink {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl MetricsSink for PrometheusSink {
    async fn record(&self, sample: MetricSample) -> Result<()> {
        if !sample.value.is_finite() {
            return Err(Error::metrics(format!(
                "non-finite value for metric '{}'",
                sample.name
            )));
        }

        ::metrics::histogram!(
            prometheus_name(&self.namespace, &sample.name),
            "unit" => sample.unit.as_str()
        )
        .record(sample.value);
        Ok(())
    }
}

/// `FoodOrders` + `OrderPrice` -> `food_orders_order_price`
fn prometheus_name(namespace: &str, name: &str) -> String {
    let mut out = String::new();
    for part in [namespace, name] {
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('_');
        }
        let mut prev_lower = false;
        for ch in part.chars() {
            if ch.is_ascii_uppercase() && prev_lower {
                out.push('_');
            }
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            if ch.is_ascii_alphanumeric() {
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push('_');
            }
        }
    }
    out
}

/// Sink that keeps samples in memory, mostly useful in tests
#[derive(Default)]
pub struct MemorySink {
    samples: Mutex<Vec<MetricSample>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `record` call fails
    pub fn failing() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MetricsSink for MemorySink {
    async fn record(&self, sample: MetricSample) -> Result<()> {
        if self.fail {
            return Err(Error::metrics("metrics sink unavailable"));
        }
        self.samples
            .lock()
            .map_err(|_| Error::metrics("metrics sink lock poisoned"))?
            .push(sample);
        Ok(())
    }
}

/// Metrics configuration
#[derive(Debug, Clone)]
pub enum MetricsConfig {
    Disabled,
    Prometheus { namespace: String },
}

/// Create a metrics sink, plus the exporter handle when one was installed
pub fn create_metrics(
    config: MetricsConfig,
) -> Result<(Arc<dyn MetricsSink>, Option<PrometheusHandle>)> {
    match config {
        MetricsConfig::Disabled => Ok((Arc::new(DisabledSink), None)),
        MetricsConfig::Prometheus { namespace } => {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| Error::metrics(format!("failed to install recorder: {}", e)))?;
            Ok((Arc::new(PrometheusSink::new(namespace)), Some(handle)))
        }
    }
}
