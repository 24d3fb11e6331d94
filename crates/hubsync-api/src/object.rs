//! The generic schema-less object document.
//!
//! Kinds are not known at compile time, so objects are represented as a
//! generic document with typed metadata and opaque `spec`/`status`
//! subtrees. Typed projections (compliance lists, hub profiles) are
//! extracted only where the core actually reads them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::identity::{ResourceIdentity, ResourceKind};

/// One object instance: metadata plus independently-addressable `spec`
/// and `status` substructures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// The kind this object belongs to.
    pub kind: ResourceKind,
    /// Object name, unique within (kind, namespace).
    pub name: String,
    /// Namespace, if the kind is namespace-scoped.
    pub namespace: Option<String>,
    /// Label map. Carries the provenance label on replicated objects.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Server-assigned unique id; `None` until created.
    #[serde(default)]
    pub uid: Option<Uuid>,
    /// Opaque optimistic-concurrency token; 0 means unset.
    #[serde(default)]
    pub resource_version: u64,
    /// Finalizers blocking deletion; server-managed on replicas.
    #[serde(default)]
    pub finalizers: Vec<String>,
    /// Deletion timestamp in unix milliseconds, set by the owning server.
    #[serde(default)]
    pub deletion_timestamp_ms: Option<u64>,
    /// Desired state.
    #[serde(default)]
    pub spec: Value,
    /// Observed state, mutated independently of spec.
    #[serde(default)]
    pub status: Value,
}

impl Object {
    /// Create a bare object with empty spec and status.
    pub fn new(kind: ResourceKind, namespace: Option<&str>, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            labels: BTreeMap::new(),
            uid: None,
            resource_version: 0,
            finalizers: Vec::new(),
            deletion_timestamp_ms: None,
            spec: Value::Null,
            status: Value::Null,
        }
    }

    /// The identity addressing this object on its cluster.
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    /// The `namespace/name` (or bare `name`) form used in logs.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    /// A deep copy with every server-assigned field cleared: uid,
    /// resource version, finalizers, and deletion timestamp. This is the
    /// shape an object must have before being applied to another cluster.
    pub fn stripped(&self) -> Self {
        let mut copy = self.clone();
        copy.uid = None;
        copy.resource_version = 0;
        copy.finalizers.clear();
        copy.deletion_timestamp_ms = None;
        copy
    }

    /// Equality over everything the spec-replication path owns: labels,
    /// finalizers, and the spec subtree. Server-assigned fields and
    /// status are ignored.
    pub fn spec_equal(&self, other: &Object) -> bool {
        self.labels == other.labels
            && self.finalizers == other.finalizers
            && self.spec == other.spec
    }

    /// Equality over the status subtree only.
    pub fn status_equal(&self, other: &Object) -> bool {
        self.status == other.status
    }
}
