//! # Runtime
//!
//! Process bootstrap and the controller watch loop.
//!
//! - `initialization`: rustls, tracing, metrics, probe server and client setup
//! - `watch_loop`: Drives reconciliations from the `CloudConfig` watch
//! - `error_policy`: Backoff for failed reconciliations and stream error logging

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
