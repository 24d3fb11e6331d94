//! Resource-kind descriptors and per-object identities.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A resource-kind descriptor: which API group, version, and plural kind
/// name an object belongs to. Rendered as `plural.version.group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKind {
    /// API group, e.g. `policy.hubsync.io`.
    pub group: String,
    /// API version within the group, e.g. `v1`.
    pub version: String,
    /// Plural kind name, e.g. `policies`.
    pub plural: String,
}

impl ResourceKind {
    /// Create a descriptor from its three parts.
    pub fn new(group: &str, version: &str, plural: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            plural: plural.to_string(),
        }
    }

    /// Parse a `plural.version.group` string, e.g.
    /// `policies.v1.policy.hubsync.io`. The group is everything after the
    /// second dot and may itself contain dots.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let mut parts = s.splitn(3, '.');
        let plural = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        let group = parts.next().unwrap_or_default();
        if plural.is_empty() || version.is_empty() || group.is_empty() {
            return Err(IdentityError::InvalidKind(s.to_string()));
        }
        Ok(Self::new(group, version, plural))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.plural, self.version, self.group)
    }
}

/// Uniquely addresses one object instance on one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// The kind the object belongs to.
    pub kind: ResourceKind,
    /// Namespace, if the kind is namespace-scoped.
    pub namespace: Option<String>,
    /// Object name, unique within (kind, namespace).
    pub name: String,
}

impl ResourceIdentity {
    /// The `namespace/name` (or bare `name`) form used in logs.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.qualified_name())
    }
}

/// Which direction a syncer moves data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncDirection {
    /// Watch the global hub and apply specs to the regional hub.
    Down,
    /// Watch the regional hub and apply statuses to the global hub.
    Up,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Down => write!(f, "down"),
            SyncDirection::Up => write!(f, "up"),
        }
    }
}

/// Errors from parsing identities.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Not a valid `plural.version.group` string.
    #[error("invalid resource kind: {0}")]
    InvalidKind(String),
}

/// Well-known resource kinds watched by the syncer and the aggregator.
pub mod kinds {
    use super::ResourceKind;

    /// Compliance policies, the primary replicated kind.
    pub fn policies() -> ResourceKind {
        ResourceKind::new("policy.hubsync.io", "v1", "policies")
    }

    /// Bindings attaching policies to placements.
    pub fn placement_bindings() -> ResourceKind {
        ResourceKind::new("policy.hubsync.io", "v1", "placementbindings")
    }

    /// Placement rules selecting target clusters.
    pub fn placement_rules() -> ResourceKind {
        ResourceKind::new("apps.hubsync.io", "v1", "placementrules")
    }

    /// Managed clusters registered with a regional hub (cluster-scoped).
    pub fn managed_clusters() -> ResourceKind {
        ResourceKind::new("cluster.hubsync.io", "v1", "managedclusters")
    }

    /// Add-ons installed on a regional hub (cluster-scoped).
    pub fn addons() -> ResourceKind {
        ResourceKind::new("addon.hubsync.io", "v1alpha1", "clusteraddons")
    }

    /// Synthesized per-regional-hub profile objects (cluster-scoped).
    pub fn hub_profiles() -> ResourceKind {
        ResourceKind::new("cluster.hubsync.io", "v1alpha1", "hubprofiles")
    }
}
