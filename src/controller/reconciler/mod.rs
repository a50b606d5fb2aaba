//! # Reconciler
//!
//! Core reconciliation logic for `CloudConfig` resources.
//!
//! ## Reconciliation Flow
//!
//! 1. Select the environments that are due (all of them on a new generation)
//! 2. Resolve each environment over the resource defaults
//! 3. Reconcile the environments concurrently:
//!    - Build a config server client from the environment's secrets
//!    - Discover the managed apps, or use `appName` alone
//!    - Fetch and assemble every app's manifest
//!    - Apply the manifest to the environment's namespace
//! 4. Schedule the next cycle of each periodic environment
//! 5. Update status

pub mod credentials;
pub mod environment;
pub mod fanout;
pub mod reconcile;
pub mod resolve;
pub mod schedule;
pub mod status;
pub mod types;
pub mod validation;

// Re-export public API
pub use environment::{reconcile_environment, EnvironmentContext};
pub use fanout::{reconcile_all, CycleSummary, EnvironmentOutcome};
pub use reconcile::{reconcile, reconcile_once, resource_key};
pub use resolve::{resolve, CredentialKeys, EnvironmentConfig};
pub use schedule::{next_cycle, NextCycle, ScheduleState};
pub use types::{BackoffState, Reconciler, ReconcilerError};
