//! # Custom Resource Definitions
//!
//! CRD types for the Cloud Config Operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `CloudConfig` specification, per-environment settings and credentials
//! - `status.rs` - Status types for tracking reconciliation state

mod spec;
mod status;

// Re-export all public types
pub use spec::{CloudConfig, CloudConfigSpec, CredentialsSpec, EnvironmentSpec};
pub use status::{CloudConfigStatus, Condition};
