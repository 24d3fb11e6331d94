//! The read-mostly watch cache.
//!
//! One cache per (cluster, kind): it consumes the kind's watch feed,
//! keeps a concurrent index of the latest observed objects, and forwards
//! each event to an optional controller channel only after the index has
//! absorbed it, so a worker looking up an identity always sees at least
//! the state that triggered it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

use hubsync_api::identity::{ResourceIdentity, ResourceKind};
use hubsync_api::object::Object;

use crate::store::{Cluster, WatchEvent};

type Key = (Option<String>, String);

/// Cached view of one kind on one cluster, safe for concurrent readers.
pub struct WatchCache {
    kind: ResourceKind,
    index: DashMap<Key, Object>,
}

impl WatchCache {
    /// Snapshot the kind, start the pump task, and return the cache.
    ///
    /// The initial snapshot is replayed as `Added` events into `events`
    /// (when given), matching how a fresh watch lists before streaming.
    /// The pump stops when `shutdown` flips or the feed closes.
    pub async fn start(
        cluster: &Arc<Cluster>,
        kind: ResourceKind,
        events: Option<mpsc::Sender<WatchEvent>>,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<WatchCache> {
        let (snapshot, rx) = cluster.watch(&kind).await;
        let cache = Arc::new(WatchCache {
            kind,
            index: DashMap::new(),
        });
        for obj in &snapshot {
            cache
                .index
                .insert((obj.namespace.clone(), obj.name.clone()), obj.clone());
        }

        let pump = Arc::clone(&cache);
        tokio::spawn(async move {
            pump.run(snapshot, rx, events, shutdown).await;
        });

        cache
    }

    /// The kind this cache serves.
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Latest observed object for an identity, if present.
    pub fn get(&self, id: &ResourceIdentity) -> Option<Object> {
        self.index
            .get(&(id.namespace.clone(), id.name.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Snapshot of every cached object.
    pub fn list(&self) -> Vec<Object> {
        self.index
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache currently holds no objects.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    async fn run(
        self: Arc<Self>,
        snapshot: Vec<Object>,
        mut rx: broadcast::Receiver<WatchEvent>,
        mut events: Option<mpsc::Sender<WatchEvent>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if let Some(tx) = &events {
            for obj in snapshot {
                if tx.send(WatchEvent::Added(obj)).await.is_err() {
                    events = None;
                    break;
                }
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!(kind = %self.kind, "watch cache stopping");
                    return;
                }
                event = rx.recv() => match event {
                    Ok(event) => {
                        self.absorb(&event);
                        if let Some(tx) = &events {
                            if tx.send(event).await.is_err() {
                                events = None;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(kind = %self.kind, missed, "watch feed lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(kind = %self.kind, "watch feed closed");
                        return;
                    }
                },
            }
        }
    }

    fn absorb(&self, event: &WatchEvent) {
        match event {
            WatchEvent::Added(obj) | WatchEvent::Updated { new: obj, .. } => {
                self.index
                    .insert((obj.namespace.clone(), obj.name.clone()), obj.clone());
            }
            WatchEvent::Deleted(obj) => {
                self.index.remove(&(obj.namespace.clone(), obj.name.clone()));
            }
        }
    }
}
