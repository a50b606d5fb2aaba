//! # Apply Executor
//!
//! Applies an assembled manifest to an environment's namespace.
//!
//! The manifest is piped to `kubectl --namespace=<ns> apply --prune --all -f -`,
//! so objects that were applied before but are missing from the current
//! manifest are deleted. The exit status and combined output are the only
//! success signal. No retries happen here; the next scheduled cycle retries.

use crate::constants::{NAMESPACE_LABEL_APP, NAMESPACE_LABEL_ENV, NAMESPACE_LABEL_SYS};
use crate::controller::error::ReconcileError;
use crate::controller::manifest::ManifestBuffer;
use crate::observability::metrics;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Labels identifying the owner of a managed namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceLabels {
    pub app: String,
    pub sys: String,
    pub env: String,
}

impl NamespaceLabels {
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (NAMESPACE_LABEL_APP.to_string(), self.app.clone()),
            (NAMESPACE_LABEL_SYS.to_string(), self.sys.clone()),
            (NAMESPACE_LABEL_ENV.to_string(), self.env.clone()),
        ])
    }
}

/// Cluster side of the pipeline
#[async_trait]
pub trait ClusterApplier: Send + Sync {
    /// Create the namespace or update its labels
    async fn ensure_namespace(
        &self,
        namespace: &str,
        labels: &NamespaceLabels,
    ) -> Result<(), ReconcileError>;

    /// Apply `manifest` to `namespace`, pruning everything it no longer contains
    ///
    /// Returns the tool's combined output.
    async fn apply(&self, namespace: &str, manifest: &str) -> Result<String, ReconcileError>;
}

/// Result of [`apply_manifest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Manifest was empty, nothing was invoked
    Skipped,
    Applied { output: String },
}

/// Apply `manifest`, skipping the call entirely when it is empty
pub async fn apply_manifest(
    applier: &dyn ClusterApplier,
    namespace: &str,
    manifest: &ManifestBuffer,
) -> Result<ApplyOutcome, ReconcileError> {
    if manifest.is_empty() {
        info!(namespace = namespace, "Manifest is empty, skipping apply");
        return Ok(ApplyOutcome::Skipped);
    }

    let start = Instant::now();
    let result = applier.apply(namespace, manifest.as_str()).await;
    metrics::observe_apply_duration(start.elapsed().as_secs_f64());

    match result {
        Ok(output) => {
            metrics::increment_applies("success");
            info!(
                namespace = namespace,
                documents = manifest.document_count(),
                "Applied manifest to namespace {}",
                namespace
            );
            debug!("{}", output);
            Ok(ApplyOutcome::Applied { output })
        }
        Err(e) => {
            metrics::increment_applies("error");
            Err(e)
        }
    }
}

/// Namespaces through the Kubernetes API, manifests through kubectl
#[derive(Clone)]
pub struct KubectlApplier {
    client: Client,
    kubectl: String,
    field_manager: String,
}

impl std::fmt::Debug for KubectlApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubectlApplier")
            .field("kubectl", &self.kubectl)
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubectlApplier {
    #[must_use]
    pub fn new(client: Client, kubectl: impl Into<String>, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            kubectl: kubectl.into(),
            field_manager: field_manager.into(),
        }
    }
}

/// Arguments passed to kubectl for `namespace`
#[must_use]
pub fn kubectl_apply_args(namespace: &str) -> Vec<String> {
    vec![
        format!("--namespace={namespace}"),
        "apply".to_string(),
        "--prune".to_string(),
        "--all".to_string(),
        "-f".to_string(),
        "-".to_string(),
    ]
}

/// Run `program` with `args`, feeding `input` on stdin
///
/// Returns stdout and stderr concatenated, and whether the process exited successfully.
pub async fn run_with_input(
    program: &str,
    args: &[String],
    input: &[u8],
) -> std::io::Result<(bool, String)> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Write on a separate task so a chatty child cannot stall on a full stdout pipe
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        })
    });

    let output = child.wait_with_output().await?;
    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            // The child may exit before reading everything; its status decides
            Ok(Err(e)) => debug!("Writing to {} stdin failed: {}", program, e),
            Err(e) => debug!("Stdin writer task for {} failed: {}", program, e),
        }
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((output.status.success(), combined))
}

#[async_trait]
impl ClusterApplier for KubectlApplier {
    async fn ensure_namespace(
        &self,
        namespace: &str,
        labels: &NamespaceLabels,
    ) -> Result<(), ReconcileError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let patch = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {
                "name": namespace,
                "labels": labels.to_map(),
            }
        });

        namespaces
            .patch(
                namespace,
                &PatchParams::apply(&self.field_manager).force(),
                &Patch::Apply(&patch),
            )
            .await
            .map_err(|e| ReconcileError::Apply {
                namespace: namespace.to_string(),
                output: format!("failed to create or update namespace: {e}"),
            })?;

        debug!("Namespace {} is up to date", namespace);
        Ok(())
    }

    async fn apply(&self, namespace: &str, manifest: &str) -> Result<String, ReconcileError> {
        let args = kubectl_apply_args(namespace);
        let (success, output) = run_with_input(&self.kubectl, &args, manifest.as_bytes())
            .await
            .map_err(|e| ReconcileError::Apply {
                namespace: namespace.to_string(),
                output: format!("failed to execute {}: {e}", self.kubectl),
            })?;

        if !success {
            error!("kubectl apply failed for namespace {}: {}", namespace, output);
            return Err(ReconcileError::Apply {
                namespace: namespace.to_string(),
                output,
            });
        }
        Ok(output)
    }
}
