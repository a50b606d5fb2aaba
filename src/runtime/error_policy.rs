//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::CloudConfig;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource to avoid cross-resource interference.
pub fn handle_reconciliation_error(
    obj: Arc<CloudConfig>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {:?}", name, error);
    observability::metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(resource_key)
                .or_insert_with(|| BackoffState::new(ctx.config.backoff()));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!(
                "Failed to lock backoff_states: {}, using default backoff",
                e
            );
            (ctx.config.reconciliation_error_requeue_secs, 0)
        }
    };

    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {})",
        backoff_seconds, error_count
    );
    let next_trigger_time = i64::try_from(backoff_seconds)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
        .and_then(|delay| chrono::Utc::now().checked_add_signed(delay));
    if let Some(next_trigger_time) = next_trigger_time {
        info!(
            "Next retry scheduled: {} (in {}s)",
            next_trigger_time.to_rfc3339(),
            backoff_seconds
        );
    }

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Classification of a controller stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version expired, the watcher relists
    Expired,
    /// 429: API server storage reinitializing
    TooManyRequests,
    /// 404: resource deleted or CRD missing
    NotFound,
    /// Reconciler returned an error, already handled by the error policy
    Reconciler,
    Other,
}

/// Classify a controller stream error by its debug representation
///
/// 404 is checked before 401 since a plain text 404 body surfaces as a
/// serde error that also mentions `WatchFailed`.
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if error_string.starts_with("ReconcilerFailed") {
        WatchErrorKind::Reconciler
    } else if is_not_found {
        WatchErrorKind::NotFound
    } else if error_string.contains("401") || error_string.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::TooManyRequests
    } else {
        WatchErrorKind::Other
    }
}

/// Log a controller stream error with the diagnostics for its class
pub fn handle_watch_stream_error(error_string: &str) -> WatchErrorKind {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    let kind = classify_watch_error(error_string);
    match kind {
        WatchErrorKind::Unauthorized => {
            error!(
                "Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
            );
            error!("Verify the ClusterRole and ClusterRoleBinding of the operator:");
            error!(
                "   kubectl auth can-i list cloudconfigs --as=system:serviceaccount:<namespace>:cloud-config-operator --all-namespaces"
            );
        }
        WatchErrorKind::Expired => {
            warn!(
                "Watch resource version expired (410) - this is normal during pod restarts, watch will relist"
            );
        }
        WatchErrorKind::TooManyRequests => {
            warn!("API server storage reinitializing (429), watch will back off and retry");
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Resource not found (404) - this may be normal if the resource was deleted or the CRD is missing. Error: {}",
                error_string
            );
        }
        WatchErrorKind::Reconciler => {
            // Logged by handle_reconciliation_error
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
        }
    }
    kind
}
