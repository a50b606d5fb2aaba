//! Common test utilities for the integration tests
//!
//! Provides rustls crypto provider setup and in-memory stand-ins for the
//! secret store and the cluster.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use cloud_config_operator::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// This must be called before any client is built.
/// Uses a `Once` to ensure it's only called once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Ignore the error when another test already installed a provider
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Secrets held in memory, keyed by `namespace/name`
#[derive(Debug, Default)]
pub struct MemorySecrets {
    secrets: BTreeMap<String, SecretData>,
}

impl MemorySecrets {
    pub fn with_secret(mut self, namespace: &str, name: &str, entries: &[(&str, &str)]) -> Self {
        let data = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.as_bytes().to_vec()))
            .collect();
        self.secrets.insert(format!("{namespace}/{name}"), data);
        self
    }
}

#[async_trait]
impl SecretSource for MemorySecrets {
    async fn secret_data(&self, namespace: &str, name: &str) -> Result<SecretData, ReconcileError> {
        self.secrets
            .get(&format!("{namespace}/{name}"))
            .cloned()
            .ok_or_else(|| ReconcileError::Secret {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: "not found".to_string(),
            })
    }
}

/// Records every namespace and manifest it is asked to apply
#[derive(Debug, Default)]
pub struct RecordingApplier {
    pub namespaces: Mutex<Vec<(String, NamespaceLabels)>>,
    pub applies: Mutex<Vec<(String, String)>>,
}

impl RecordingApplier {
    pub fn applies(&self) -> Vec<(String, String)> {
        self.applies.lock().unwrap().clone()
    }

    pub fn namespaces(&self) -> Vec<(String, NamespaceLabels)> {
        self.namespaces.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterApplier for RecordingApplier {
    async fn ensure_namespace(
        &self,
        namespace: &str,
        labels: &NamespaceLabels,
    ) -> Result<(), ReconcileError> {
        self.namespaces
            .lock()
            .unwrap()
            .push((namespace.to_string(), labels.clone()));
        Ok(())
    }

    async fn apply(&self, namespace: &str, manifest: &str) -> Result<String, ReconcileError> {
        self.applies
            .lock()
            .unwrap()
            .push((namespace.to_string(), manifest.to_string()));
        Ok(format!("applied to {namespace}"))
    }
}
