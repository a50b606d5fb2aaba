//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::CloudConfig;
use crate::observability;
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// How long to wait for the probe server to bind
const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const SERVER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for CloudConfig resources in all namespaces
    pub configs: Api<CloudConfig>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "server_ready",
                &self
                    .server_state
                    .is_ready
                    .load(std::sync::atomic::Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Install the rustls crypto provider and the tracing subscriber
///
/// Must run before any TLS connection is made. Safe to call more than once.
pub fn init_process(config: &ControllerConfig) {
    let default_filter = format!("cloud_config_operator={}", config.log_level);
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .try_init()
    {
        warn!("Tracing subscriber init returned error: {}", e);
    }

    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
/// - Startup summary of existing resources
pub async fn initialize(config: ControllerConfig) -> Result<InitializationResult> {
    info!("Starting Cloud Config Operator");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let configs: Api<CloudConfig> = Api::all(client.clone());
    let reconciler = Arc::new(Reconciler::new(client.clone(), config));

    summarize_existing_resources(&configs).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        configs,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state
            .is_ready
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > SERVER_STARTUP_TIMEOUT {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                SERVER_STARTUP_TIMEOUT.as_secs()
            ));
        }

        tokio::time::sleep(SERVER_POLL_INTERVAL).await;
    }
}

/// Log the CloudConfig resources present at startup, by namespace
///
/// The watch reconciles all of them once it starts.
async fn summarize_existing_resources(configs: &Api<CloudConfig>) {
    match configs.list(&ListParams::default()).await {
        Ok(list) => {
            let mut resources_by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                resources_by_namespace
                    .entry(
                        item.metadata
                            .namespace
                            .clone()
                            .unwrap_or_else(|| "default".to_string()),
                    )
                    .or_default()
                    .push(
                        item.metadata
                            .name
                            .clone()
                            .unwrap_or_else(|| "unknown".to_string()),
                    );
            }

            info!(
                "CRD is queryable, found {} existing CloudConfig resources in {} namespace(s)",
                list.items.len(),
                resources_by_namespace.len()
            );
            for (namespace, mut resources) in resources_by_namespace {
                resources.sort();
                info!(
                    "Namespace: {} - Resources ({}): {}",
                    namespace,
                    resources.len(),
                    resources.join(", ")
                );
            }
        }
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
