//! Cloud Config Operator Library
//!
//! Keeps Kubernetes namespaces in sync with deployment manifests served by a
//! Spring Cloud Config server.
//!
//! ## Quick Start
//!
//! ```rust
//! use cloud_config_operator::prelude::*;
//! ```
//!
//! This brings commonly used types into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod config_server;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
