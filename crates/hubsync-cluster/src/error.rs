//! Error types for the cluster API.

use thiserror::Error;

/// Errors returned by cluster operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// No object exists at the addressed (kind, namespace, name).
    #[error("not found: {kind} {name}")]
    NotFound {
        /// Kind in `plural.version.group` form.
        kind: String,
        /// Qualified `namespace/name` of the missing object.
        name: String,
    },

    /// A create collided with an existing object.
    #[error("already exists: {kind} {name}")]
    AlreadyExists {
        /// Kind in `plural.version.group` form.
        kind: String,
        /// Qualified `namespace/name` of the existing object.
        name: String,
    },

    /// The caller's resource version no longer matches the stored object.
    #[error("version conflict: submitted {submitted}, current {current}")]
    VersionConflict {
        /// The resource version the caller conditioned on.
        submitted: u64,
        /// The resource version currently stored.
        current: u64,
    },

    /// The submitted object violates the API contract.
    #[error("malformed object: {0}")]
    Malformed(String),
}

impl ClusterError {
    /// Whether retrying the operation can succeed without intervention.
    /// Version conflicts and not-found races are transient; malformed
    /// objects and create collisions are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClusterError::VersionConflict { .. } => true,
            ClusterError::NotFound { .. } => true,
            ClusterError::AlreadyExists { .. } => false,
            ClusterError::Malformed(_) => false,
        }
    }
}
