//! # Watch Loop
//!
//! Controller watch loop that monitors CloudConfig resources and triggers
//! reconciliation when changes are detected or an environment is due.

use crate::controller::reconciler::{reconcile, resource_key, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::CloudConfig;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{watcher, Controller};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

/// Run the controller watch loop until a shutdown signal is received
pub async fn run_watch_loop(
    configs: Api<CloudConfig>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    // Mark the pod not ready as soon as shutdown starts so no new traffic is routed
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown_server_state.set_ready(false);
            info!(
                "Marked server as not ready, waiting for in-flight reconciliations to complete..."
            );
        }
    });

    let watch_span = tracing::span!(
        tracing::Level::INFO,
        "controller.watch",
        operation = "watch_loop"
    );

    info!("Starting controller watch loop...");
    let controller = Controller::new(configs, watcher::Config::default().any_semantic());
    let store = controller.store();
    controller
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
        .for_each(|result| {
            match result {
                Ok((object, _action)) => {
                    debug!(
                        resource.name = %object.name,
                        resource.namespace = object.namespace.as_deref().unwrap_or("default"),
                        "watch.event.success"
                    );
                }
                Err(e) => {
                    handle_watch_stream_error(&format!("{e:?}"));
                }
            }
            // Forget deleted resources
            let live: HashSet<String> = store
                .state()
                .iter()
                .map(|resource| resource_key(resource))
                .collect();
            reconciler.retain_resources(&live);
            futures::future::ready(())
        })
        .instrument(watch_span)
        .await;

    info!("Controller stopped gracefully");
    Ok(())
}
