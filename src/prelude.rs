//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use cloud_config_operator::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, reconcile_all, reconcile_once, resolve, BackoffState, CycleSummary,
    EnvironmentConfig, EnvironmentContext, Reconciler, ReconcilerError,
};

// Collaborator traits - implement these to drive the pipeline without a cluster
pub use crate::controller::apply::{ClusterApplier, NamespaceLabels};
pub use crate::controller::secrets::{SecretData, SecretSource};

// Config server client
pub use crate::config_server::{ClientOption, ConfigServerClient};

// Config types - for configuration management
pub use crate::config::ControllerConfig;

// Common error types
pub use crate::controller::error::{FailureKind, FieldViolation, ReconcileError};
