//! # Fan-out
//!
//! Reconciles every environment of a resource concurrently.
//!
//! Each environment runs on its own task. A failure or panic in one task is
//! recorded as that environment's outcome and never reaches its siblings.
//! [`reconcile_all`] returns only after every task has finished.

use crate::controller::error::{FailureKind, ReconcileError};
use crate::controller::reconciler::environment::{reconcile_environment, EnvironmentContext};
use crate::controller::reconciler::resolve::resolve;
use crate::crd::EnvironmentSpec;
use crate::observability::metrics;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{error, info, warn};

/// Result of one environment's cycle
#[derive(Debug)]
pub struct EnvironmentOutcome {
    pub key: String,
    /// Sync period, `None` for run-once and misconfigured environments
    ///
    /// A validation failure is terminal until the resource changes, so it is
    /// never rescheduled.
    pub period: Option<Duration>,
    pub result: Result<Vec<String>, ReconcileError>,
}

impl EnvironmentOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregate of one fan-out
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_environments: BTreeSet<String>,
    pub outcomes: Vec<EnvironmentOutcome>,
}

impl CycleSummary {
    fn record(&mut self, outcome: EnvironmentOutcome) {
        self.total += 1;
        match &outcome.result {
            Ok(_) => {
                self.succeeded += 1;
                metrics::increment_environment_outcomes("success", "none");
            }
            Err(e) => {
                self.failed += 1;
                self.failed_environments.insert(outcome.key.clone());
                metrics::increment_environment_outcomes("error", e.kind().as_str());
            }
        }
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Resolve and reconcile every environment of `parent_name`
///
/// Environments that fail to resolve are counted as failed without any I/O.
pub async fn reconcile_all(
    parent_name: &str,
    defaults: &EnvironmentSpec,
    environments: &BTreeMap<String, EnvironmentSpec>,
    ctx: &EnvironmentContext,
) -> CycleSummary {
    let mut summary = CycleSummary::default();
    let mut tasks = Vec::new();

    for (key, overrides) in environments {
        match resolve(parent_name, defaults, overrides, key) {
            Ok(env) => {
                let ctx = ctx.clone();
                let period = env.period();
                let key = key.clone();
                let handle = tokio::spawn(async move { reconcile_environment(&env, &ctx).await });
                tasks.push((key, period, handle));
            }
            Err(e) => {
                error!(environment = %key, "Invalid configuration for {}: {}", key, e);
                summary.record(EnvironmentOutcome {
                    key: key.clone(),
                    period: None,
                    result: Err(e),
                });
            }
        }
    }

    let (meta, handles): (Vec<_>, Vec<_>) = tasks
        .into_iter()
        .map(|(key, period, handle)| ((key, period), handle))
        .unzip();
    let joined = futures::future::join_all(handles).await;

    for ((key, period), joined) in meta.into_iter().zip(joined) {
        let result = joined.unwrap_or_else(|e| Err(unhandled(e)));
        let period = match &result {
            Err(e) if e.kind() == FailureKind::Validation => None,
            _ => period,
        };
        if let Err(e) = &result {
            error!(
                environment = %key,
                kind = %e.kind(),
                "Reconciliation of environment {} failed: {}",
                key,
                e
            );
        }
        summary.record(EnvironmentOutcome {
            key,
            period,
            result,
        });
    }

    if summary.has_failures() {
        warn!(
            "Reconciliation failed for {} out of {} environments",
            summary.failed, summary.total
        );
    } else {
        info!("Reconciled {} environment(s)", summary.total);
    }
    summary
}

fn unhandled(error: JoinError) -> ReconcileError {
    if error.is_cancelled() {
        return ReconcileError::Unhandled("task cancelled".to_string());
    }
    let message = match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked".to_string()),
        Err(e) => e.to_string(),
    };
    ReconcileError::Unhandled(format!("panic: {message}"))
}
