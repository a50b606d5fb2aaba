//! # Reconciliation Logic
//!
//! Top-level reconciliation of `CloudConfig` resources.
//!
//! A new generation runs every environment. Afterwards each periodic
//! environment is requeued on its own period and only due environments run
//! on a wakeup. Environment failures end up in the status; only a failed
//! status update is returned as an error, which `error_policy` backs off.

use crate::controller::reconciler::environment::EnvironmentContext;
use crate::controller::reconciler::fanout::{reconcile_all, CycleSummary};
use crate::controller::reconciler::status::{build_status, update_status};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::{CloudConfig, EnvironmentSpec};
use crate::observability;
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, Instrument};

/// Shortest requeue delay handed to the controller
const MIN_REQUEUE: Duration = Duration::from_secs(1);

/// Main reconciliation function
/// Errors are handled by error_policy() in the watch loop
pub async fn reconcile(
    resource: Arc<CloudConfig>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = resource.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = resource.metadata.namespace.as_deref().unwrap_or("default");
    let span = tracing::span!(
        tracing::Level::INFO,
        "reconcile",
        resource.name = name,
        resource.namespace = namespace,
        resource.kind = "CloudConfig"
    );

    let start = Instant::now();
    observability::metrics::increment_reconciliations();
    let result = reconcile_due(&resource, &ctx).instrument(span).await;
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    result
}

async fn reconcile_due(resource: &CloudConfig, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    let name = resource.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = resource.metadata.namespace.as_deref().unwrap_or("default");
    let resource_key = resource_key(resource);
    let generation = resource.metadata.generation;

    let started_at = Instant::now();
    let due = ctx
        .schedules()
        .entry(resource_key.clone())
        .or_default()
        .due_environments(
            resource.metadata.uid.as_deref(),
            generation,
            resource.spec.environments.keys(),
            started_at,
        );

    let status_is_stale = resource
        .status
        .as_ref()
        .and_then(|status| status.observed_generation)
        != generation;
    if due.is_empty() && !status_is_stale {
        debug!("No environments of {} are due", resource_key);
        return Ok(next_action(ctx, &resource_key, started_at));
    }

    let selected: BTreeMap<String, EnvironmentSpec> = resource
        .spec
        .environments
        .iter()
        .filter(|(key, _)| due.contains(*key))
        .map(|(key, env)| (key.clone(), env.clone()))
        .collect();
    info!(
        "Reconciling {} of {} environment(s) of CloudConfig {}",
        selected.len(),
        resource.spec.environments.len(),
        resource_key
    );

    let environments = ctx.environments.for_namespace(namespace);
    let summary = reconcile_all(name, &resource.spec.defaults, &selected, &environments).await;
    let finished_at = Instant::now();

    let (results, next_wakeup) = {
        let mut schedules = ctx.schedules();
        let state = schedules.entry(resource_key.clone()).or_default();
        for outcome in &summary.outcomes {
            state.record(
                &outcome.key,
                outcome.succeeded(),
                outcome.period,
                started_at,
                finished_at,
            );
        }
        (state.results().clone(), state.next_wakeup(finished_at))
    };

    let status = build_status(generation, &results, chrono::Utc::now(), next_wakeup);
    update_status(&ctx.client, &ctx.config.field_manager, resource, &status)
        .await
        .map_err(|source| ReconcilerError::StatusUpdate {
            resource: resource_key.clone(),
            source,
        })?;

    ctx.reset_backoff(&resource_key);
    Ok(action_for(next_wakeup))
}

/// Key of the per-resource schedule and backoff state
#[must_use]
pub fn resource_key(resource: &CloudConfig) -> String {
    format!(
        "{}/{}",
        resource.metadata.namespace.as_deref().unwrap_or("default"),
        resource.metadata.name.as_deref().unwrap_or("unknown")
    )
}

/// Reconcile every environment of `resource` once, outside the controller
pub async fn reconcile_once(resource: &CloudConfig, ctx: &EnvironmentContext) -> CycleSummary {
    let name = resource.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = resource.metadata.namespace.as_deref().unwrap_or("default");
    let environments = ctx.for_namespace(namespace);
    reconcile_all(
        name,
        &resource.spec.defaults,
        &resource.spec.environments,
        &environments,
    )
    .await
}

fn next_action(ctx: &Reconciler, resource_key: &str, now: Instant) -> Action {
    let next_wakeup = ctx
        .schedules()
        .get(resource_key)
        .and_then(|state| state.next_wakeup(now));
    action_for(next_wakeup)
}

fn action_for(next_wakeup: Option<Duration>) -> Action {
    match next_wakeup {
        Some(delay) => {
            let delay = delay.max(MIN_REQUEUE);
            debug!("Next environment is due in {}s", delay.as_secs());
            observability::metrics::increment_requeues_total("schedule");
            Action::requeue(delay)
        }
        None => Action::await_change(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_for_pending_wakeup() {
        assert_eq!(
            action_for(Some(Duration::from_secs(30))),
            Action::requeue(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_action_for_overdue_wakeup_is_clamped() {
        assert_eq!(action_for(Some(Duration::ZERO)), Action::requeue(MIN_REQUEUE));
    }

    #[test]
    fn test_action_for_nothing_periodic() {
        assert_eq!(action_for(None), Action::await_change());
    }

    #[test]
    fn test_resource_key() {
        let mut resource = CloudConfig::new("shop", crate::crd::CloudConfigSpec::default());
        assert_eq!(resource_key(&resource), "default/shop");
        resource.metadata.namespace = Some("shop-system".to_string());
        assert_eq!(resource_key(&resource), "shop-system/shop");
    }
}
