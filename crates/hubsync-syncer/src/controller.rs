//! The generic, direction-parametrized sync controller.
//!
//! One controller per direction: it watches its designated kinds on the
//! "from" cluster, classifies each event (provenance filtering plus a
//! direction-specific diff), and queues changed identities. A small pool
//! of workers drains the queue; every attempt reconciles against the
//! latest cached state, so rapid successive changes coalesce.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use hubsync_api::identity::{ResourceIdentity, ResourceKind, SyncDirection};
use hubsync_api::provenance::is_origin_copy;
use hubsync_cluster::{Cluster, WatchCache, WatchEvent};

use crate::error::SyncError;
use crate::queue::{QueueConfig, WorkQueue};

/// Capacity of the per-kind event channel between cache pump and
/// classifier.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A running sync controller for one direction.
pub struct SyncController {
    name: String,
    direction: SyncDirection,
    syncer_namespace: String,
    from_endpoint: String,
    from_caches: HashMap<ResourceKind, Arc<WatchCache>>,
    to: Arc<Cluster>,
    queue: Arc<WorkQueue<ResourceIdentity>>,
}

impl SyncController {
    /// Build the controller, start its watch caches and classifier
    /// tasks, and spawn `workers` queue drainers. Stops cooperatively
    /// when `shutdown` flips; in-flight items finish their attempt.
    pub async fn start(
        from: Arc<Cluster>,
        to: Arc<Cluster>,
        direction: SyncDirection,
        syncer_namespace: &str,
        kinds: Vec<ResourceKind>,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<SyncController> {
        let name = match direction {
            SyncDirection::Down => format!("down--{}-->{}", from.name(), to.name()),
            SyncDirection::Up => format!("up--{}-->{}", from.name(), to.name()),
        };

        let mut from_caches = HashMap::new();
        let mut feeds = Vec::new();
        for kind in kinds {
            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let cache =
                WatchCache::start(&from, kind.clone(), Some(tx), shutdown.clone()).await;
            info!(controller = %name, kind = %kind, "set up watch");
            from_caches.insert(kind.clone(), cache);
            feeds.push((kind, rx));
        }

        let controller = Arc::new(SyncController {
            name,
            direction,
            syncer_namespace: syncer_namespace.to_string(),
            from_endpoint: from.endpoint().to_string(),
            from_caches,
            to,
            queue: Arc::new(WorkQueue::new(QueueConfig::default())),
        });

        for (kind, mut rx) in feeds {
            let classifier = Arc::clone(&controller);
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    classifier.observe(&kind, event);
                }
            });
        }

        // Propagate shutdown into the queue so workers wake and exit.
        {
            let queue = Arc::clone(&controller.queue);
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let _ = shutdown.changed().await;
                queue.shut_down();
            });
        }

        info!(controller = %controller.name, workers, "starting syncer workers");
        for _ in 0..workers {
            let worker = Arc::clone(&controller);
            tokio::spawn(async move { worker.run_worker().await });
        }

        controller
    }

    /// The controller's log name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direction this controller syncs in.
    pub fn direction(&self) -> SyncDirection {
        self.direction
    }

    /// Namespace identifying this syncer on the global hub.
    pub(crate) fn syncer_namespace(&self) -> &str {
        &self.syncer_namespace
    }

    /// Endpoint of the watched "from" cluster.
    pub(crate) fn from_endpoint(&self) -> &str {
        &self.from_endpoint
    }

    /// The destination cluster handle.
    pub(crate) fn to(&self) -> &Arc<Cluster> {
        &self.to
    }

    /// Cached objects of a kind on the "from" cluster, if watched.
    pub(crate) fn cache(&self, kind: &ResourceKind) -> Option<&Arc<WatchCache>> {
        self.from_caches.get(kind)
    }

    /// Classify one watch event and enqueue its identity if it needs
    /// reconciliation.
    fn observe(&self, kind: &ResourceKind, event: WatchEvent) {
        if !self.should_enqueue(&event) {
            return;
        }
        let obj = event.object();
        debug!(controller = %self.name, %kind, object = %obj.qualified_name(), "queueing");
        self.queue.add(obj.identity());
    }

    /// Event classification: provenance filtering plus the
    /// direction-specific no-op suppression diff.
    fn should_enqueue(&self, event: &WatchEvent) -> bool {
        match event {
            WatchEvent::Added(obj) | WatchEvent::Deleted(obj) => is_origin_copy(obj),
            WatchEvent::Updated { old, new } => {
                if !is_origin_copy(new) {
                    return false;
                }
                match self.direction {
                    SyncDirection::Down => !new.spec_equal(old),
                    SyncDirection::Up => !new.status_equal(old),
                }
            }
        }
    }

    async fn run_worker(self: Arc<Self>) {
        while let Some(id) = self.queue.get().await {
            match self.process(&id).await {
                Ok(()) => {
                    self.queue.forget(&id);
                }
                Err(err) if err.is_retryable() => {
                    warn!(controller = %self.name, identity = %id, %err, "sync failed; will retry");
                    self.queue.add_rate_limited(id.clone());
                }
                Err(err) => {
                    warn!(controller = %self.name, identity = %id, %err, "sync failed; dropping");
                    self.queue.forget(&id);
                }
            }
            self.queue.done(&id);
        }
        debug!(controller = %self.name, "worker stopped");
    }

    /// Reconcile one identity against the latest cached state.
    pub(crate) async fn process(&self, id: &ResourceIdentity) -> Result<(), SyncError> {
        let cache = self
            .from_caches
            .get(&id.kind)
            .ok_or_else(|| SyncError::UnknownKind(id.kind.to_string()))?;

        match cache.get(id) {
            None => {
                if self.direction == SyncDirection::Down {
                    debug!(controller = %self.name, identity = %id, "source gone; deleting downstream");
                    self.delete_from_downstream(id).await
                } else {
                    // Upstream mirrors are owned by the global hub once
                    // reported; nothing to do for a vanished source.
                    Ok(())
                }
            }
            Some(obj) => match self.direction {
                SyncDirection::Down => self.apply_to_downstream(&obj).await,
                SyncDirection::Up => self.update_status_in_upstream(&obj).await,
            },
        }
    }

    /// Test hook: the controller's queue.
    pub fn queue(&self) -> &Arc<WorkQueue<ResourceIdentity>> {
        &self.queue
    }
}
