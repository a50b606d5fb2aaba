//! # CloudConfig Status
//!
//! Status types for tracking reconciliation state and conditions.

use serde::{Deserialize, Serialize};

/// Status of the CloudConfig resource
///
/// Summarizes the most recent cycle across all environments.
#[derive(Debug, Clone, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfigStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
    /// Next scheduled reconciliation time (RFC3339), absent when nothing is periodic
    #[serde(default)]
    pub next_reconcile_time: Option<String>,
    /// Environments reconciled in the last cycle
    #[serde(default)]
    pub environments_total: Option<i32>,
    #[serde(default)]
    pub environments_succeeded: Option<i32>,
    #[serde(default)]
    pub environments_failed: Option<i32>,
    /// Keys of environments that failed in the last cycle, sorted
    #[serde(default)]
    pub failed_environments: Vec<String>,
}

/// Condition for status
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
