//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Fibonacci backoff floor for failed reconciliations (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Fibonacci backoff ceiling for failed reconciliations (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Timeout applied to each config server request (seconds)
pub const DEFAULT_CONFIG_SERVER_TIMEOUT_SECS: u64 = 10;

/// Path of the kubectl binary used by the apply step
pub const DEFAULT_KUBECTL_PATH: &str = "kubectl";

/// Field manager recorded on namespace and status patches
pub const DEFAULT_FIELD_MANAGER: &str = "cloud-config-operator";

/// Default log filter when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Built-in environment defaults, applied beneath the resource-wide defaults.

/// Config server label (branch) used when none is configured
pub const DEFAULT_LABEL: &str = "master";

/// Manifest file fetched for every app
pub const DEFAULT_SPEC_FILE: &str = "deployment.yaml";

/// Config server address used when none is configured
pub const DEFAULT_SERVER: &str = "cloud-config-server:8888";

/// Period used when neither layer sets one; zero means run once
pub const DEFAULT_PERIOD_SECS: i64 = 0;

/// Longest accepted sync period (30 days)
pub const MAX_PERIOD_SECS: i64 = 30 * 24 * 60 * 60;

/// Default credential secret entry names
pub const DEFAULT_USERNAME_KEY: &str = "username";
pub const DEFAULT_PASSWORD_KEY: &str = "password";
pub const DEFAULT_TOKEN_KEY: &str = "token";
pub const DEFAULT_CERT_KEY: &str = "cert.pem";
pub const DEFAULT_KEY_KEY: &str = "key.pem";
pub const DEFAULT_ROOT_CA_KEY: &str = "ca.pem";

/// Labels put on every managed namespace
pub const NAMESPACE_LABEL_APP: &str = "app";
pub const NAMESPACE_LABEL_SYS: &str = "sys";
pub const NAMESPACE_LABEL_ENV: &str = "env";

/// Separator line between YAML documents
pub const YAML_SEPARATOR: &str = "---";
