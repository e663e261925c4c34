//! Controller manager - orchestrates per-resource schedulers.
//!
//! Looks up the connector for each configured resource and starts one
//! reconcile scheduler per resource.

use std::collections::HashMap;
use std::sync::Arc;
use team_provider::config::ReconcileConfig;
use team_provider::ManagedResource;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::context::CancelHandle;
use crate::registry::Registry;
use crate::runners::{ManagedReconciler, ReconcileStatus, ResourceScheduler};

type StatusMap = HashMap<String, Arc<tokio::sync::Mutex<ReconcileStatus>>>;

/// Runs one scheduler per managed resource.
pub struct ControllerManager {
    registry: Registry,
    settings: ReconcileConfig,
    /// Cancels every scheduler and any in-flight call on shutdown
    shutdown: CancelHandle,
    /// Scheduler handles keyed by `Kind/name`
    handles: HashMap<String, JoinHandle<()>>,
    status_map: Arc<tokio::sync::Mutex<StatusMap>>,
}

impl ControllerManager {
    pub fn new(registry: Registry, settings: ReconcileConfig) -> Self {
        Self {
            registry,
            settings,
            shutdown: CancelHandle::new(),
            handles: HashMap::new(),
            status_map: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }

    /// Returns a clone of the status map for external monitoring.
    pub fn status_map(&self) -> Arc<tokio::sync::Mutex<StatusMap>> {
        Arc::clone(&self.status_map)
    }

    /// Starts a scheduler for every resource whose kind has a connector.
    ///
    /// # Returns
    /// Number of schedulers started
    pub async fn start(&mut self, resources: Vec<ManagedResource>) -> usize {
        info!(
            resource_count = resources.len(),
            kinds = ?self.registry.kinds(),
            "Starting controller manager"
        );

        let mut started = 0;
        for resource in resources {
            if self.start_resource(resource).await {
                started += 1;
            }
        }

        if started == 0 {
            warn!("No managed resources to reconcile");
        }
        started
    }

    /// Starts a scheduler for one resource, replacing any existing one for the same key.
    ///
    /// Returns false when no connector handles the resource's kind.
    pub async fn start_resource(&mut self, resource: ManagedResource) -> bool {
        let key = resource.key();
        let Some(connector) = self.registry.get(resource.kind()) else {
            warn!(resource = %key, kind = %resource.kind(), "No connector for resource kind, skipping");
            return false;
        };

        let scheduler = ResourceScheduler::new(
            ManagedReconciler::new(connector),
            resource,
            self.settings.clone(),
            self.shutdown.context(),
        );
        let status = scheduler.status();
        let handle = scheduler.start();

        if let Some(old) = self.handles.insert(key.clone(), handle) {
            old.abort();
            info!(resource = %key, "Aborted existing scheduler before restart");
        }
        self.status_map.lock().await.insert(key, status);
        true
    }

    /// Snapshot of every resource's status, sorted by key.
    pub async fn status_snapshot(&self) -> Vec<(String, ReconcileStatus)> {
        let entries: Vec<(String, Arc<tokio::sync::Mutex<ReconcileStatus>>)> = {
            let map = self.status_map.lock().await;
            map.iter().map(|(k, v)| (k.clone(), Arc::clone(v))).collect()
        };

        let mut snapshot = Vec::with_capacity(entries.len());
        for (key, status) in entries {
            snapshot.push((key, status.lock().await.clone()));
        }
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    /// Cancels every scheduler and waits for them to stop.
    ///
    /// In-flight remote calls are abandoned through the shared cancel signal.
    pub async fn shutdown(&mut self) {
        info!(scheduler_count = self.handles.len(), "Shutting down controller manager");
        self.shutdown.cancel();

        for (key, handle) in self.handles.drain() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(resource = %key, error = %e, "Scheduler task failed");
                }
            }
        }

        info!("All schedulers stopped");
    }
}

impl Drop for ControllerManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}
