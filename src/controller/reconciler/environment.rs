//! # Environment Reconciler
//!
//! One cycle for one environment:
//!
//! 1. Build the config server client from the environment's secrets
//! 2. Use `appName` alone, or discover the app list and sort it
//! 3. Fetch every app's spec file and assemble the manifest
//! 4. Ensure the namespace exists, then apply the manifest
//!
//! The first failing step ends the cycle. Nothing is applied unless every
//! file was fetched.

use crate::config_server::ConfigServerClient;
use crate::controller::apply::{apply_manifest, ApplyOutcome, ClusterApplier, NamespaceLabels};
use crate::controller::error::ReconcileError;
use crate::controller::manifest::ManifestBuffer;
use crate::controller::reconciler::credentials::client_options;
use crate::controller::reconciler::resolve::EnvironmentConfig;
use crate::controller::secrets::SecretSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Collaborators shared by every environment of one resource
#[derive(Clone)]
pub struct EnvironmentContext {
    pub secrets: Arc<dyn SecretSource>,
    pub applier: Arc<dyn ClusterApplier>,
    /// Namespace the credential and trust store secrets are read from
    pub secret_namespace: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for EnvironmentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentContext")
            .field("secret_namespace", &self.secret_namespace)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl EnvironmentContext {
    /// Same collaborators, secrets read from `namespace`
    #[must_use]
    pub fn for_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            secret_namespace: namespace.into(),
            ..self.clone()
        }
    }
}

/// Reconcile `env`, returning the apps whose manifests were applied
pub async fn reconcile_environment(
    env: &EnvironmentConfig,
    ctx: &EnvironmentContext,
) -> Result<Vec<String>, ReconcileError> {
    let options = client_options(
        env,
        ctx.secrets.as_ref(),
        &ctx.secret_namespace,
        ctx.request_timeout,
    )
    .await?;
    let client = ConfigServerClient::new(&env.server, options)?;
    debug!(
        environment = %env.key,
        "Using config server {}",
        client.base_url()
    );

    let apps = match &env.app_list {
        None => vec![env.app_name.clone()],
        Some(field) => {
            let mut apps = client
                .discover_apps(field, &env.app_name, &env.label, &env.profiles)
                .await?;
            apps.sort();
            if apps.is_empty() {
                warn!(
                    environment = %env.key,
                    "App list '{}' of {} is empty",
                    field,
                    env.app_name
                );
            }
            apps
        }
    };

    let mut manifest = ManifestBuffer::new();
    for app in &apps {
        let file = client
            .get_config_file(&env.spec_file, app, &env.label, &env.profiles)
            .await?;
        manifest.append(app, &manifest_text(app, &env.spec_file, file)?);
    }

    let labels = NamespaceLabels {
        app: env.app_name.clone(),
        sys: env.parent_name.clone(),
        env: env.key.clone(),
    };
    ctx.applier
        .ensure_namespace(&env.namespace, &labels)
        .await?;

    match apply_manifest(ctx.applier.as_ref(), &env.namespace, &manifest).await? {
        ApplyOutcome::Skipped => {
            info!(
                environment = %env.key,
                "No manifests for {} in namespace {}",
                env.display_name,
                env.namespace
            );
        }
        ApplyOutcome::Applied { .. } => {
            info!(
                environment = %env.key,
                "Reconciled {} app(s) for {} in namespace {}",
                apps.len(),
                env.display_name,
                env.namespace
            );
        }
    }

    Ok(apps)
}

/// Spec file content as text, rejecting anything that is not UTF-8
fn manifest_text(app: &str, file_name: &str, content: Vec<u8>) -> Result<String, ReconcileError> {
    String::from_utf8(content).map_err(|e| ReconcileError::Encoding {
        app: app.to_string(),
        file: file_name.to_string(),
        detail: e.utf8_error().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::error::FailureKind;

    #[test]
    fn test_manifest_text() {
        assert_eq!(
            manifest_text("shop", "deployment.yaml", b"kind: Service\n".to_vec()).unwrap(),
            "kind: Service\n"
        );
    }

    #[test]
    fn test_non_utf8_manifest_is_rejected() {
        let error = manifest_text("shop", "deployment.yaml", vec![b'k', 0xff, 0xfe, b'\n']).unwrap_err();
        assert_eq!(error.kind(), FailureKind::Remote);
        let message = error.to_string();
        assert!(message.contains("'shop'"), "unexpected message: {message}");
        assert!(message.contains("'deployment.yaml'"), "unexpected message: {message}");
    }
}
