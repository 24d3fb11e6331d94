//! The in-memory cluster store.
//!
//! One [`Cluster`] stands in for a participating cluster's API surface:
//! per-kind object maps, a cluster-wide monotonically increasing version
//! counter stamping `resource_version` on every write, and a broadcast
//! watch feed per kind. All mutation goes through resource-version
//! preconditions except [`Cluster::apply`], the force-merge upsert.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use hubsync_api::identity::ResourceKind;
use hubsync_api::object::Object;

use crate::error::ClusterError;

/// Watch feed capacity per kind. Slow consumers past this lag are
/// dropped with a warning by the cache.
const WATCH_CHANNEL_CAPACITY: usize = 256;

/// One change observed on a watch feed.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// An object appeared (or was part of the initial snapshot replay).
    Added(Object),
    /// An object changed.
    Updated {
        /// State before the change.
        old: Object,
        /// State after the change.
        new: Object,
    },
    /// An object was removed.
    Deleted(Object),
}

impl WatchEvent {
    /// The object the event is about (the new state for updates).
    pub fn object(&self) -> &Object {
        match self {
            WatchEvent::Added(o) | WatchEvent::Deleted(o) => o,
            WatchEvent::Updated { new, .. } => new,
        }
    }
}

type Key = (Option<String>, String);

struct KindStore {
    objects: HashMap<Key, Object>,
    managers: HashMap<Key, String>,
    tx: broadcast::Sender<WatchEvent>,
}

impl KindStore {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            objects: HashMap::new(),
            managers: HashMap::new(),
            tx,
        }
    }

    fn emit(&self, event: WatchEvent) {
        // No receivers is fine; the feed is best-effort until someone watches.
        let _ = self.tx.send(event);
    }
}

struct Inner {
    version_counter: u64,
    kinds: HashMap<ResourceKind, KindStore>,
}

impl Inner {
    fn kind_store(&mut self, kind: &ResourceKind) -> &mut KindStore {
        self.kinds.entry(kind.clone()).or_insert_with(KindStore::new)
    }

    fn next_version(&mut self) -> u64 {
        self.version_counter += 1;
        self.version_counter
    }
}

/// An in-memory cluster: list/watch plus create/update/patch/delete over
/// arbitrary resource kinds.
pub struct Cluster {
    name: String,
    endpoint: String,
    inner: Mutex<Inner>,
}

impl Cluster {
    /// Create a named cluster with a derived endpoint.
    pub fn new(name: &str) -> Self {
        Self::with_endpoint(name, &format!("https://{name}.hubsync.local:6443"))
    }

    /// Create a named cluster with an explicit API endpoint.
    pub fn with_endpoint(name: &str, endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            inner: Mutex::new(Inner {
                version_counter: 0,
                kinds: HashMap::new(),
            }),
        }
    }

    /// The cluster's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cluster's API endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one object.
    pub async fn get(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Object, ClusterError> {
        let mut inner = self.inner.lock().await;
        let store = inner.kind_store(kind);
        store
            .objects
            .get(&key_of(namespace, name))
            .cloned()
            .ok_or_else(|| not_found(kind, namespace, name))
    }

    /// Snapshot of every object of a kind.
    pub async fn list(&self, kind: &ResourceKind) -> Vec<Object> {
        let mut inner = self.inner.lock().await;
        inner.kind_store(kind).objects.values().cloned().collect()
    }

    /// Create a new object. The incoming object must not carry a resource
    /// version; uid and version are server-assigned.
    pub async fn create(&self, obj: Object) -> Result<Object, ClusterError> {
        if obj.resource_version != 0 {
            return Err(ClusterError::Malformed(
                "create must not carry a resource version".to_string(),
            ));
        }
        let mut inner = self.inner.lock().await;
        let version = inner.next_version();
        let store = inner.kind_store(&obj.kind);
        let key = key_of(obj.namespace.as_deref(), &obj.name);
        if store.objects.contains_key(&key) {
            return Err(ClusterError::AlreadyExists {
                kind: obj.kind.to_string(),
                name: obj.qualified_name(),
            });
        }
        let mut stored = obj;
        stored.uid = Some(Uuid::new_v4());
        stored.resource_version = version;
        store.objects.insert(key, stored.clone());
        store.emit(WatchEvent::Added(stored.clone()));
        Ok(stored)
    }

    /// Replace an object, conditioned on its resource version.
    pub async fn update(&self, obj: Object) -> Result<Object, ClusterError> {
        let mut inner = self.inner.lock().await;
        let version = inner.next_version();
        let store = inner.kind_store(&obj.kind);
        let key = key_of(obj.namespace.as_deref(), &obj.name);
        let existing = store
            .objects
            .get(&key)
            .ok_or_else(|| not_found(&obj.kind, obj.namespace.as_deref(), &obj.name))?
            .clone();
        if obj.resource_version != existing.resource_version {
            return Err(ClusterError::VersionConflict {
                submitted: obj.resource_version,
                current: existing.resource_version,
            });
        }
        let mut stored = obj;
        stored.uid = existing.uid;
        stored.resource_version = version;
        store.objects.insert(key, stored.clone());
        store.emit(WatchEvent::Updated {
            old: existing,
            new: stored.clone(),
        });
        Ok(stored)
    }

    /// Replace only the status subtree, conditioned on the resource
    /// version. Spec and metadata keep their stored values.
    pub async fn update_status(&self, obj: Object) -> Result<Object, ClusterError> {
        let mut inner = self.inner.lock().await;
        let version = inner.next_version();
        let store = inner.kind_store(&obj.kind);
        let key = key_of(obj.namespace.as_deref(), &obj.name);
        let existing = store
            .objects
            .get(&key)
            .ok_or_else(|| not_found(&obj.kind, obj.namespace.as_deref(), &obj.name))?
            .clone();
        if obj.resource_version != existing.resource_version {
            return Err(ClusterError::VersionConflict {
                submitted: obj.resource_version,
                current: existing.resource_version,
            });
        }
        let mut stored = existing.clone();
        stored.status = obj.status;
        stored.resource_version = version;
        store.objects.insert(key, stored.clone());
        store.emit(WatchEvent::Updated {
            old: existing,
            new: stored.clone(),
        });
        Ok(stored)
    }

    /// Force-merge upsert owned by a single named field manager.
    ///
    /// Creates the object if absent; otherwise overwrites labels,
    /// finalizers, and spec regardless of the caller's resource version.
    /// Status is destination-owned: blank on create, preserved on
    /// update, and never taken from the caller. Never fails on conflict;
    /// an upsert that changes nothing leaves the stored object untouched.
    pub async fn apply(&self, field_manager: &str, obj: Object) -> Result<Object, ClusterError> {
        let mut inner = self.inner.lock().await;
        let version = inner.next_version();
        let store = inner.kind_store(&obj.kind);
        let key = key_of(obj.namespace.as_deref(), &obj.name);
        match store.objects.get(&key).cloned() {
            None => {
                let mut stored = obj;
                stored.uid = Some(Uuid::new_v4());
                stored.resource_version = version;
                stored.status = Value::Null;
                store.objects.insert(key.clone(), stored.clone());
                store.managers.insert(key, field_manager.to_string());
                store.emit(WatchEvent::Added(stored.clone()));
                Ok(stored)
            }
            Some(existing) => {
                if existing.spec_equal(&obj) {
                    // Converged already; avoid a spurious version bump.
                    store.managers.insert(key, field_manager.to_string());
                    return Ok(existing);
                }
                let mut stored = existing.clone();
                stored.labels = obj.labels;
                stored.finalizers = obj.finalizers;
                stored.spec = obj.spec;
                stored.resource_version = version;
                store.objects.insert(key.clone(), stored.clone());
                store.managers.insert(key, field_manager.to_string());
                store.emit(WatchEvent::Updated {
                    old: existing,
                    new: stored.clone(),
                });
                Ok(stored)
            }
        }
    }

    /// Remove an object by name, returning the removed state.
    pub async fn delete(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Object, ClusterError> {
        let mut inner = self.inner.lock().await;
        let store = inner.kind_store(kind);
        let key = key_of(namespace, name);
        match store.objects.remove(&key) {
            Some(removed) => {
                store.managers.remove(&key);
                store.emit(WatchEvent::Deleted(removed.clone()));
                Ok(removed)
            }
            None => Err(not_found(kind, namespace, name)),
        }
    }

    /// Current snapshot of a kind plus a stream of subsequent events.
    /// Snapshot and subscription happen atomically, so no event between
    /// them can be missed.
    pub async fn watch(
        &self,
        kind: &ResourceKind,
    ) -> (Vec<Object>, broadcast::Receiver<WatchEvent>) {
        let mut inner = self.inner.lock().await;
        let store = inner.kind_store(kind);
        let snapshot = store.objects.values().cloned().collect();
        (snapshot, store.tx.subscribe())
    }

    /// The field manager recorded by the last apply, if any.
    pub async fn manager_of(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<String> {
        let mut inner = self.inner.lock().await;
        inner
            .kind_store(kind)
            .managers
            .get(&key_of(namespace, name))
            .cloned()
    }
}

fn key_of(namespace: Option<&str>, name: &str) -> Key {
    (namespace.map(str::to_string), name.to_string())
}

fn not_found(kind: &ResourceKind, namespace: Option<&str>, name: &str) -> ClusterError {
    let qualified = match namespace {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    };
    ClusterError::NotFound {
        kind: kind.to_string(),
        name: qualified,
    }
}
