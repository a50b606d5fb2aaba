//! # Controller
//!
//! Core controller modules for the Cloud Config operator.
//!
//! - `apply`: Namespace setup and manifest apply through kubectl
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `error`: Failure taxonomy of an environment cycle
//! - `manifest`: Multi-document manifest assembly
//! - `reconciler`: Core reconciliation logic
//! - `secrets`: Credential and trust store secret lookup
//! - `server`: HTTP server for metrics and health checks

pub mod apply;
pub mod backoff;
pub mod error;
pub mod manifest;
pub mod reconciler;
pub mod secrets;
pub mod server;
