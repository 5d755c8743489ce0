//! Prometheus metrics for the booking bridge.
//!
//! All metrics follow the naming convention: `booking_bridge_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: requests by outcome, inbound messages by disposition
//! - **Gauge**: waiters currently registered
//! - **Histogram**: time from publish to settlement

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Requests handled, labelled by operation and outcome
    pub static ref BRIDGE_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("booking_bridge_requests_total", "Requests handled by the bridge"),
        &["operation", "outcome"]
    ).expect("metric creation failed");

    /// Waiters currently registered
    pub static ref PENDING_WAITERS: IntGauge = IntGauge::new(
        "booking_bridge_pending_waiters",
        "Waiters registered and not yet settled"
    ).expect("metric creation failed");

    /// Publish-to-settlement latency
    pub static ref RESPONSE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "booking_bridge_response_seconds",
            "Time from publishing a request to settling its waiter"
        ).buckets(exponential_buckets(0.005, 2.0, 12).expect("valid buckets")),
        &["operation"]
    ).expect("metric creation failed");

    /// Inbound messages, labelled by what the listener did with them
    pub static ref INBOUND_MESSAGES: IntCounterVec = IntCounterVec::new(
        Opts::new("booking_bridge_inbound_messages_total", "Messages drained from the inbound subscription"),
        &["disposition"]  // resolved, unmatched, malformed, uncorrelated
    ).expect("metric creation failed");
}

/// Handle proving the bridge metrics are registered.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BRIDGE_REQUESTS.clone()),
        Box::new(PENDING_WAITERS.clone()),
        Box::new(RESPONSE_DURATION.clone()),
        Box::new(INBOUND_MESSAGES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
