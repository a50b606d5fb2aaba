//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::apply::{ClusterApplier, KubectlApplier};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::environment::EnvironmentContext;
use crate::controller::reconciler::schedule::ScheduleState;
use crate::controller::secrets::{KubeSecretSource, SecretSource};
use kube::Client;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Failed to update status of {resource}: {source}")]
    StatusUpdate {
        resource: String,
        #[source]
        source: kube::Error,
    },
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(backoff: FibonacciBackoff) -> Self {
        Self {
            backoff,
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub config: ControllerConfig,
    // Shared by every environment task; holds no per-environment state
    pub environments: EnvironmentContext,
    // Backoff state per resource (identified by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    // Due times and latest results per resource (identified by namespace/name)
    pub schedules: Arc<Mutex<HashMap<String, ScheduleState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("environments", &self.environments)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Reconciler reading secrets through the API and applying with kubectl
    #[must_use]
    pub fn new(client: Client, config: ControllerConfig) -> Self {
        let secrets: Arc<dyn SecretSource> = Arc::new(KubeSecretSource::new(client.clone()));
        let applier: Arc<dyn ClusterApplier> = Arc::new(KubectlApplier::new(
            client.clone(),
            config.kubectl_path.clone(),
            config.field_manager.clone(),
        ));
        Self::with_collaborators(client, config, secrets, applier)
    }

    #[must_use]
    pub fn with_collaborators(
        client: Client,
        config: ControllerConfig,
        secrets: Arc<dyn SecretSource>,
        applier: Arc<dyn ClusterApplier>,
    ) -> Self {
        let environments = EnvironmentContext {
            secrets,
            applier,
            secret_namespace: "default".to_string(),
            request_timeout: config.config_server_timeout(),
        };
        Self {
            client,
            config,
            environments,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            schedules: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedule states, recovering the map if a previous holder panicked
    pub fn schedules(&self) -> MutexGuard<'_, HashMap<String, ScheduleState>> {
        self.schedules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the schedule and backoff state of resources not in `live`
    pub fn retain_resources(&self, live: &HashSet<String>) {
        self.schedules().retain(|key, _| live.contains(key));
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| live.contains(key));
    }

    /// Restart the backoff sequence of `resource_key` after a success
    pub fn reset_backoff(&self, resource_key: &str) {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get_mut(resource_key) {
            state.reset();
        }
    }
}
