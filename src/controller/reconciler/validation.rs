//! # Validation
//!
//! Field checks applied while resolving an environment.
//!
//! Each check returns the [`FieldViolation`] it found so the resolver can
//! report every problem in one error.

use crate::config_server::normalize_server_url;
use crate::controller::error::FieldViolation;
use regex::Regex;
use std::sync::LazyLock;

// RFC 1123 label: [a-z0-9]([-a-z0-9]*[a-z0-9])?
static NAMESPACE_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").ok());

/// Validate a Kubernetes namespace name (RFC 1123 label, at most 63 characters)
pub fn validate_namespace(namespace: &str) -> Result<(), FieldViolation> {
    if namespace.is_empty() {
        return Err(FieldViolation::new("namespace", "cannot be empty"));
    }

    if namespace.len() > 63 {
        return Err(FieldViolation::new(
            "namespace",
            format!(
                "'{namespace}' exceeds maximum length of 63 characters (got {})",
                namespace.len()
            ),
        ));
    }

    let valid = NAMESPACE_REGEX
        .as_ref()
        .is_some_and(|regex| regex.is_match(namespace));
    if !valid {
        return Err(FieldViolation::new(
            "namespace",
            format!(
                "'{namespace}' must be a valid Kubernetes namespace (lowercase alphanumeric, hyphens; cannot start/end with hyphen)"
            ),
        ));
    }

    Ok(())
}

/// Validate the config server address against the transport setting
pub fn validate_server(server: &str, insecure: bool) -> Result<(), FieldViolation> {
    normalize_server_url(server, insecure).map(|_| ()).map_err(|e| {
        e.violations()
            .first()
            .cloned()
            .unwrap_or_else(|| FieldViolation::new("server", e.to_string()))
    })
}
