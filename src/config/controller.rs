//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_MINUTES, DEFAULT_BACKOFF_MIN_MINUTES, DEFAULT_CONFIG_SERVER_TIMEOUT_SECS,
    DEFAULT_FIELD_MANAGER, DEFAULT_KUBECTL_PATH, DEFAULT_LOG_LEVEL, DEFAULT_METRICS_PORT,
    DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
};
use crate::controller::backoff::FibonacciBackoff;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables,
/// typically populated from a ConfigMap with `envFrom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// kubectl binary used to apply manifests
    pub kubectl_path: String,
    /// Field manager for namespace and status patches
    pub field_manager: String,
    /// Timeout of each config server request (seconds)
    pub config_server_timeout_secs: u64,
    /// Requeue interval when the backoff state cannot be read (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Fibonacci backoff floor (minutes)
    pub backoff_min_minutes: u64,
    /// Fibonacci backoff ceiling (minutes)
    pub backoff_max_minutes: u64,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            kubectl_path: DEFAULT_KUBECTL_PATH.to_string(),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            config_server_timeout_secs: DEFAULT_CONFIG_SERVER_TIMEOUT_SECS,
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            metrics_port: env_var_or_default(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            kubectl_path: env_var_or_default_str(&lookup, "KUBECTL_PATH", DEFAULT_KUBECTL_PATH),
            field_manager: env_var_or_default_str(&lookup, "FIELD_MANAGER", DEFAULT_FIELD_MANAGER),
            config_server_timeout_secs: env_var_or_default(
                &lookup,
                "CONFIG_SERVER_TIMEOUT_SECS",
                DEFAULT_CONFIG_SERVER_TIMEOUT_SECS,
            ),
            reconciliation_error_requeue_secs: env_var_or_default(
                &lookup,
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                &lookup,
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                &lookup,
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            log_level: env_var_or_default_str(&lookup, "LOG_LEVEL", DEFAULT_LOG_LEVEL),
        }
    }

    /// Get config server request timeout
    #[must_use]
    pub fn config_server_timeout(&self) -> Duration {
        Duration::from_secs(self.config_server_timeout_secs)
    }

    /// Fresh backoff calculator with the configured bounds
    #[must_use]
    pub fn backoff(&self) -> FibonacciBackoff {
        FibonacciBackoff::new(self.backoff_min_minutes, self.backoff_max_minutes)
    }
}

/// Read a variable through `lookup` or return default value
fn env_var_or_default<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a variable as string or return default
fn env_var_or_default_str(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
