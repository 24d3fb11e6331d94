//! Error types for the aggregation controller.

use thiserror::Error;

use hubsync_cluster::ClusterError;

/// Errors from reconciling one report object.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The cluster API rejected a call.
    #[error("cluster API error: {0}")]
    Cluster(#[from] ClusterError),

    /// No home record exists for a regional report. A report must never
    /// create the home record, so this is surfaced and retried by the
    /// outer queue until the record appears.
    #[error("home record missing: {namespace}/{name}")]
    HomeRecordMissing {
        /// Origin namespace the home record was expected in.
        namespace: String,
        /// Policy name.
        name: String,
    },

    /// The bounded refetch-retry loop hit its attempt limit.
    #[error("conflict retries exhausted for {name} after {attempts} attempts")]
    ConflictExhausted {
        /// Policy name being merged.
        name: String,
        /// Attempts made before giving up this cycle.
        attempts: u32,
    },

    /// The report does not have the shape the aggregator needs.
    #[error("malformed report: {0}")]
    Malformed(String),
}

impl AggregateError {
    /// Whether the outer queue should retry with backoff. Schema
    /// mismatches are dropped; everything else converges eventually.
    pub fn is_retryable(&self) -> bool {
        match self {
            AggregateError::Cluster(err) => err.is_retryable(),
            AggregateError::HomeRecordMissing { .. } => true,
            AggregateError::ConflictExhausted { .. } => true,
            AggregateError::Malformed(_) => false,
        }
    }
}
