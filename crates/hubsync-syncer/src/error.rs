//! Error types for the synchronization engine.

use thiserror::Error;

use hubsync_cluster::ClusterError;

/// Errors from processing one queued identity.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The destination (or source) cluster API rejected a call.
    #[error("cluster API error: {0}")]
    Cluster(#[from] ClusterError),

    /// A queued identity names a kind this controller has no cache for.
    #[error("no watch cache for kind {0}")]
    UnknownKind(String),

    /// The object cannot be converted to the shape the sync needs.
    #[error("malformed object: {0}")]
    Malformed(String),
}

impl SyncError {
    /// Whether the outer queue should retry the item with backoff.
    /// Schema mismatches and unknown kinds are dropped instead.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Cluster(err) => err.is_retryable(),
            SyncError::UnknownKind(_) => false,
            SyncError::Malformed(_) => false,
        }
    }
}
