//! # Status Updates
//!
//! Writes the outcome of the latest cycle to the `CloudConfig` status.

use crate::crd::{CloudConfig, CloudConfigStatus, Condition};
use chrono::{DateTime, Utc};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Build the status from the latest result of each environment
///
/// `results` maps environment keys to whether their latest cycle succeeded.
#[must_use]
pub fn build_status(
    generation: Option<i64>,
    results: &BTreeMap<String, bool>,
    now: DateTime<Utc>,
    next_wakeup: Option<Duration>,
) -> CloudConfigStatus {
    let failed_environments: Vec<String> = results
        .iter()
        .filter(|(_, succeeded)| !**succeeded)
        .map(|(key, _)| key.clone())
        .collect();
    let total = results.len();
    let failed = failed_environments.len();

    let (status, reason, message) = if failed == 0 {
        (
            "True",
            "ReconciliationSucceeded",
            format!("{total} environment(s) reconciled"),
        )
    } else {
        (
            "False",
            "ReconciliationFailed",
            format!(
                "Reconciliation failed for {failed} out of {total} environments: {}",
                failed_environments.join(", ")
            ),
        )
    };

    let next_reconcile_time = next_wakeup
        .and_then(|delay| chrono::Duration::from_std(delay).ok())
        .and_then(|delay| now.checked_add_signed(delay))
        .map(|at| at.to_rfc3339());

    CloudConfigStatus {
        conditions: vec![Condition {
            r#type: "Ready".to_string(),
            status: status.to_string(),
            last_transition_time: Some(now.to_rfc3339()),
            reason: Some(reason.to_string()),
            message: Some(message),
        }],
        observed_generation: generation,
        last_reconcile_time: Some(now.to_rfc3339()),
        next_reconcile_time,
        environments_total: i32::try_from(total).ok(),
        environments_succeeded: i32::try_from(total - failed).ok(),
        environments_failed: i32::try_from(failed).ok(),
        failed_environments,
    }
}

/// Merge-patch `status` onto `resource`
pub async fn update_status(
    client: &Client,
    field_manager: &str,
    resource: &CloudConfig,
    status: &CloudConfigStatus,
) -> Result<(), kube::Error> {
    let namespace = resource.metadata.namespace.as_deref().unwrap_or("default");
    let name = resource.metadata.name.as_deref().unwrap_or("unknown");
    let api: Api<CloudConfig> = Api::namespaced(client.clone(), namespace);

    let patch = serde_json::json!({
        "status": status
    });

    api.patch_status(name, &PatchParams::apply(field_manager), &Patch::Merge(patch))
        .await?;

    debug!("Updated status of {}/{}", namespace, name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(entries: &[(&str, bool)]) -> BTreeMap<String, bool> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect()
    }

    #[test]
    fn test_all_succeeded() {
        let now = Utc::now();
        let status = build_status(
            Some(3),
            &results(&[("dev", true), ("prod", true)]),
            now,
            Some(Duration::from_secs(60)),
        );
        assert_eq!(status.observed_generation, Some(3));
        assert_eq!(status.environments_total, Some(2));
        assert_eq!(status.environments_succeeded, Some(2));
        assert_eq!(status.environments_failed, Some(0));
        assert!(status.failed_environments.is_empty());
        assert_eq!(status.conditions[0].status, "True");
        assert_eq!(
            status.next_reconcile_time,
            Some((now + chrono::Duration::seconds(60)).to_rfc3339())
        );
    }

    #[test]
    fn test_partial_failure() {
        let status = build_status(
            Some(1),
            &results(&[("dev", true), ("prod", false), ("test", false)]),
            Utc::now(),
            None,
        );
        assert_eq!(status.environments_failed, Some(2));
        assert_eq!(status.failed_environments, vec!["prod", "test"]);
        assert_eq!(status.conditions[0].status, "False");
        assert_eq!(
            status.conditions[0].message.as_deref(),
            Some("Reconciliation failed for 2 out of 3 environments: prod, test")
        );
        assert_eq!(status.next_reconcile_time, None);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = build_status(None, &results(&[("dev", false)]), Utc::now(), None);
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["environmentsFailed"], 1);
        assert_eq!(value["failedEnvironments"][0], "dev");
    }
}
