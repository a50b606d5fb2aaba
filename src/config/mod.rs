//! # Configuration
//!
//! Operator-level settings. Per-environment settings come from the
//! `CloudConfig` resource instead.

pub mod controller;

pub use controller::ControllerConfig;
