//! # Config Server
//!
//! Client for the Spring Cloud Config server that serves environment
//! manifests.
//!
//! - `client.rs` - Transport, URL normalization and the request operations
//! - `options.rs` - Composable auth, TLS and proxy options
//! - `discovery.rs` - App list parsing

mod client;
mod discovery;
mod options;

pub use client::{normalize_server_url, ConfigServerClient, DEFAULT_PROFILE};
pub use discovery::parse_app_list;
pub use options::{
    with_basic_auth, with_bearer_token, with_client_certificate, with_insecure, with_proxy,
    with_timeout, with_trust_store, ClientOption, ClientSettings,
};
