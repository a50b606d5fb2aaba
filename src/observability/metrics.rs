//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `cloud_config_reconciliations_total` - Total number of resource reconciliations
//! - `cloud_config_reconciliation_errors_total` - Reconciliations that ended in an error
//! - `cloud_config_reconciliation_duration_seconds` - Duration of resource reconciliations
//! - `cloud_config_requeues_total` - Requeues by reason
//! - `cloud_config_environments_total` - Environment cycles by result and failure kind
//! - `cloud_config_applies_total` - Apply invocations by result
//! - `cloud_config_apply_duration_seconds` - Duration of apply invocations
//! - `cloud_config_server_requests_total` - Config server requests by operation and outcome
//! - `cloud_config_server_request_duration_seconds` - Duration of config server requests

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cloud_config_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cloud_config_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cloud_config_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("cloud_config_requeues_total", "Total number of requeues by reason"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static ENVIRONMENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloud_config_environments_total",
            "Total number of environment cycles by result and failure kind",
        ),
        &["result", "kind"],
    )
    .expect("Failed to create ENVIRONMENTS_TOTAL metric - this should never happen")
});

static APPLIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloud_config_applies_total",
            "Total number of manifest applies by result",
        ),
        &["result"],
    )
    .expect("Failed to create APPLIES_TOTAL metric - this should never happen")
});

static APPLY_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cloud_config_apply_duration_seconds",
            "Duration of manifest applies in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("Failed to create APPLY_DURATION metric - this should never happen")
});

static CONFIG_SERVER_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloud_config_server_requests_total",
            "Total number of config server requests by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create CONFIG_SERVER_REQUESTS_TOTAL metric - this should never happen")
});

static CONFIG_SERVER_REQUEST_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cloud_config_server_request_duration_seconds",
            "Duration of config server requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create CONFIG_SERVER_REQUEST_DURATION metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ENVIRONMENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(APPLIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(APPLY_DURATION.clone()))?;
    REGISTRY.register(Box::new(CONFIG_SERVER_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFIG_SERVER_REQUEST_DURATION.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

/// `kind` is `none` for successful cycles
pub fn increment_environment_outcomes(result: &str, kind: &str) {
    ENVIRONMENTS_TOTAL.with_label_values(&[result, kind]).inc();
}

pub fn increment_applies(result: &str) {
    APPLIES_TOTAL.with_label_values(&[result]).inc();
}

pub fn observe_apply_duration(duration: f64) {
    APPLY_DURATION.observe(duration);
}

pub fn increment_config_server_requests(operation: &str, outcome: &str) {
    CONFIG_SERVER_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn observe_config_server_request_duration(duration: f64) {
    CONFIG_SERVER_REQUEST_DURATION.observe(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_counters() {
        let before = ENVIRONMENTS_TOTAL
            .with_label_values(&["test", "shape"])
            .get();
        increment_environment_outcomes("test", "shape");
        assert_eq!(
            ENVIRONMENTS_TOTAL.with_label_values(&["test", "shape"]).get(),
            before + 1
        );

        let before = CONFIG_SERVER_REQUESTS_TOTAL
            .with_label_values(&["test", "success"])
            .get();
        increment_config_server_requests("test", "success");
        assert_eq!(
            CONFIG_SERVER_REQUESTS_TOTAL
                .with_label_values(&["test", "success"])
                .get(),
            before + 1
        );
    }
}
