//! # Secret Source
//!
//! Lookup of credential and trust store secrets.
//!
//! The reconciler only consumes resolved bytes; where they come from is behind
//! the [`SecretSource`] trait so the pipeline can be driven without a cluster.

use crate::controller::error::ReconcileError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// Secret entries by key
pub type SecretData = BTreeMap<String, Vec<u8>>;

#[async_trait]
pub trait SecretSource: Send + Sync {
    /// All entries of secret `name` in `namespace`
    async fn secret_data(&self, namespace: &str, name: &str) -> Result<SecretData, ReconcileError>;
}

/// Reads secrets through the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
}

impl std::fmt::Debug for KubeSecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretSource").finish_non_exhaustive()
    }
}

impl KubeSecretSource {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretSource for KubeSecretSource {
    async fn secret_data(&self, namespace: &str, name: &str) -> Result<SecretData, ReconcileError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets
            .get(name)
            .await
            .map_err(|e| ReconcileError::Secret {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let mut data: SecretData = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect();

        // stringData is write-only on the API server but shows up in fixtures
        for (key, value) in secret.string_data.unwrap_or_default() {
            data.entry(key).or_insert_with(|| value.into_bytes());
        }

        debug!(
            "Loaded secret {}/{} with {} entries",
            namespace,
            name,
            data.len()
        );
        Ok(data)
    }
}
