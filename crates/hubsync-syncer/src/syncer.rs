//! Syncer bootstrap: one Down controller (specs, global → regional) and
//! one Up controller (statuses, regional → global) sharing a shutdown
//! signal.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use hubsync_api::identity::{kinds, ResourceKind, SyncDirection};
use hubsync_cluster::Cluster;

use crate::controller::SyncController;

/// Configuration that varies across syncer deployments.
pub struct SyncerConfig {
    /// The global hub (the "up" destination and "down" source).
    pub upstream: Arc<Cluster>,
    /// The regional hub this syncer serves.
    pub downstream: Arc<Cluster>,
    /// Namespace identifying this syncer on the global hub.
    pub syncer_namespace: String,
    /// Worker tasks per direction.
    pub workers: usize,
}

/// A running pair of sync controllers.
pub struct Syncer {
    /// Down direction: global hub specs onto the regional hub.
    pub spec: Arc<SyncController>,
    /// Up direction: regional hub statuses onto the global hub.
    pub status: Arc<SyncController>,
}

/// Resource kinds replicated downstream.
pub fn down_kinds() -> Vec<ResourceKind> {
    vec![
        kinds::policies(),
        kinds::placement_bindings(),
        kinds::placement_rules(),
    ]
}

/// Resource kinds reported upstream.
pub fn up_kinds() -> Vec<ResourceKind> {
    vec![
        kinds::policies(),
        kinds::managed_clusters(),
        kinds::addons(),
    ]
}

/// Start both directions. Controllers stop when `shutdown` flips.
pub async fn start_syncer(cfg: SyncerConfig, shutdown: watch::Receiver<bool>) -> Syncer {
    info!(
        upstream = cfg.upstream.name(),
        downstream = cfg.downstream.name(),
        namespace = %cfg.syncer_namespace,
        "creating spec syncer"
    );
    let spec = SyncController::start(
        Arc::clone(&cfg.upstream),
        Arc::clone(&cfg.downstream),
        SyncDirection::Down,
        &cfg.syncer_namespace,
        down_kinds(),
        cfg.workers,
        shutdown.clone(),
    )
    .await;

    info!(
        upstream = cfg.upstream.name(),
        downstream = cfg.downstream.name(),
        namespace = %cfg.syncer_namespace,
        "creating status syncer"
    );
    let status = SyncController::start(
        Arc::clone(&cfg.downstream),
        Arc::clone(&cfg.upstream),
        SyncDirection::Up,
        &cfg.syncer_namespace,
        up_kinds(),
        cfg.workers,
        shutdown,
    )
    .await;

    Syncer { spec, status }
}
