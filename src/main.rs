//! # Cloud Config Operator
//!
//! A Kubernetes operator that keeps namespaces in sync with deployment
//! manifests served by a Spring Cloud Config server.
//!
//! ## Overview
//!
//! Each `CloudConfig` resource declares one or more environments. For every
//! environment the operator:
//!
//! 1. **Resolves** the environment settings over the resource-wide defaults
//! 2. **Discovers** the managed apps from the config server, or manages `appName` alone
//! 3. **Fetches** each app's spec file and concatenates them into one manifest
//! 4. **Applies** the manifest with `kubectl apply --prune --all` in the environment namespace
//! 5. **Reschedules** itself on the environment's period
//!
//! ## Usage
//!
//! ```bash
//! # Run as an operator inside the cluster
//! cloud-config-operator
//!
//! # Reconcile a single resource file once and exit
//! cloud-config-operator --reconcile shop.yaml
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use cloud_config_operator::config::ControllerConfig;
use cloud_config_operator::controller::reconciler::{reconcile_once, Reconciler};
use cloud_config_operator::crd::CloudConfig;
use cloud_config_operator::runtime::initialization::{init_process, initialize};
use cloud_config_operator::runtime::watch_loop::run_watch_loop;
use kube::Client;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Cloud Config Operator
#[derive(Debug, Parser)]
#[command(name = "cloud-config-operator", version, about, long_about = None)]
struct Cli {
    /// Reconcile the CloudConfig in FILE once instead of running the operator
    #[arg(long, value_name = "FILE")]
    reconcile: Option<PathBuf>,

    /// Namespace of the resource in FILE (overrides metadata.namespace)
    #[arg(short, long, requires = "reconcile")]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ControllerConfig::from_env();
    init_process(&config);

    match cli.reconcile {
        Some(path) => run_once(&path, cli.namespace, config).await,
        None => run_operator(config).await,
    }
}

async fn run_operator(config: ControllerConfig) -> Result<()> {
    let init = initialize(config).await?;
    run_watch_loop(init.configs, init.reconciler, init.server_state).await
}

async fn run_once(path: &Path, namespace: Option<String>, config: ControllerConfig) -> Result<()> {
    let resource = load_resource(path, namespace)?;
    let name = resource.metadata.name.as_deref().unwrap_or("unknown");
    info!("Reconciling {} from {}", name, path.display());

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let reconciler = Reconciler::new(client, config);

    let summary = reconcile_once(&resource, &reconciler.environments).await;
    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(apps) => info!("{}: reconciled [{}]", outcome.key, apps.join(", ")),
            Err(e) => error!("{}: {} ({})", outcome.key, e, e.kind()),
        }
    }

    if summary.has_failures() {
        anyhow::bail!(
            "Reconciliation failed for {} out of {} environments",
            summary.failed,
            summary.total
        );
    }
    Ok(())
}

fn load_resource(path: &Path, namespace: Option<String>) -> Result<CloudConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut resource: CloudConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse CloudConfig from {}", path.display()))?;
    if namespace.is_some() {
        resource.metadata.namespace = namespace;
    }
    Ok(resource)
}
