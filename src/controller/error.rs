//! # Reconcile Errors
//!
//! Failure taxonomy for one environment's reconciliation cycle.
//!
//! Every failure is tagged with a [`FailureKind`] at the point it is detected,
//! so the fan-out summary and the metrics never need to inspect messages.

use std::fmt;
use thiserror::Error;

/// One violated field of an environment's effective configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed or incomplete configuration, reported before any I/O
    #[error("invalid configuration: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// Config server answered with something other than 200
    #[error("unhandled HTTP response '{status} {reason}' from {url}")]
    Remote {
        url: String,
        status: u16,
        reason: String,
    },

    /// Config server could not be reached
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Credential or trust store secret could not be read
    #[error("failed to read secret {namespace}/{name}: {message}")]
    Secret {
        namespace: String,
        name: String,
        message: String,
    },

    /// Config server served a spec file that is not UTF-8 text
    #[error("file '{file}' of app '{app}' is not valid UTF-8: {detail}")]
    Encoding {
        app: String,
        file: String,
        detail: String,
    },

    /// App list field missing or of an unexpected type
    #[error("app list field '{field}' {detail}")]
    Shape { field: String, detail: String },

    /// The apply step failed for the namespace
    #[error("apply to namespace '{namespace}' failed: {output}")]
    Apply { namespace: String, output: String },

    /// Fault caught at the environment task boundary
    #[error("unhandled fault: {0}")]
    Unhandled(String),
}

/// Classification used for summaries and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    Validation,
    Remote,
    Shape,
    Apply,
    Unhandled,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Remote => "remote",
            FailureKind::Shape => "shape",
            FailureKind::Apply => "apply",
            FailureKind::Unhandled => "unhandled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReconcileError {
    /// Single-field validation error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ReconcileError::Validation(vec![FieldViolation::new(field, message)])
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            ReconcileError::Validation(_) => FailureKind::Validation,
            ReconcileError::Remote { .. }
            | ReconcileError::Transport { .. }
            | ReconcileError::Secret { .. }
            | ReconcileError::Encoding { .. } => FailureKind::Remote,
            ReconcileError::Shape { .. } => FailureKind::Shape,
            ReconcileError::Apply { .. } => FailureKind::Apply,
            ReconcileError::Unhandled(_) => FailureKind::Unhandled,
        }
    }

    /// Violations carried by a validation error, empty for every other kind
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ReconcileError::Validation(violations) => violations,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
