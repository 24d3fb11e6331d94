//! The policy compliance aggregator.
//!
//! Watches policies on the global hub. Regional reports (objects whose
//! provenance label differs from their namespace) are folded into the
//! home record living at (origin namespace, name): per-cluster
//! compliance entries are counted, the source's previous counts are
//! replaced, and the totals move by the delta — all under a bounded
//! retry-on-conflict loop against the home record's resource version.

use std::sync::Arc;

use tracing::{debug, info, warn};

use hubsync_api::compliance::{ClusterCompliance, ComplianceState, ComplianceSummary};
use hubsync_api::identity::{kinds, ResourceKind};
use hubsync_api::object::Object;
use hubsync_api::provenance::{origin_namespace, ORIGIN_NAMESPACE_LABEL};
use hubsync_cluster::{Cluster, ClusterError};

use crate::error::AggregateError;
use crate::generic::Reconciler;

/// Attempts per merge cycle before surfacing `ConflictExhausted`.
const DEFAULT_CONFLICT_RETRIES: u32 = 5;

/// Reconciler merging regional compliance reports into home records.
pub struct PolicyAggregator {
    cluster: Arc<Cluster>,
    max_conflict_retries: u32,
}

impl PolicyAggregator {
    /// Aggregator against the given global hub cluster.
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self::with_retries(cluster, DEFAULT_CONFLICT_RETRIES)
    }

    /// Aggregator with an explicit conflict-retry bound.
    pub fn with_retries(cluster: Arc<Cluster>, max_conflict_retries: u32) -> Self {
        Self {
            cluster,
            max_conflict_retries,
        }
    }

    /// Count a report's per-cluster entries. Entries in unknown states
    /// are logged and excluded.
    fn count_report(obj: &Object) -> Result<Option<(u32, u32)>, AggregateError> {
        let entries = ClusterCompliance::list_from_status(&obj.status)
            .map_err(|err| AggregateError::Malformed(format!("per-cluster status: {err}")))?;
        if entries.is_empty() {
            return Ok(None);
        }
        let mut compliant = 0u32;
        let mut non_compliant = 0u32;
        for entry in &entries {
            match entry.state() {
                ComplianceState::Compliant => compliant += 1,
                ComplianceState::NonCompliant => non_compliant += 1,
                ComplianceState::Unknown(state) => {
                    warn!(
                        cluster = %entry.cluster_name,
                        %state,
                        "cluster with unknown compliance state; excluded from counts"
                    );
                }
            }
        }
        Ok(Some((compliant, non_compliant)))
    }

    /// The bounded refetch-mutate-write transaction against the home
    /// record.
    async fn merge_into_home(
        &self,
        origin: &str,
        source: &str,
        name: &str,
        compliant: u32,
        non_compliant: u32,
    ) -> Result<(), AggregateError> {
        for _attempt in 0..self.max_conflict_retries {
            let home = match self
                .cluster
                .get(&kinds::policies(), Some(origin), name)
                .await
            {
                Ok(obj) => obj,
                Err(ClusterError::NotFound { .. }) => {
                    return Err(AggregateError::HomeRecordMissing {
                        namespace: origin.to_string(),
                        name: name.to_string(),
                    });
                }
                Err(err) => return Err(err.into()),
            };

            let mut summary = ComplianceSummary::from_status(&home.status)
                .map_err(|err| AggregateError::Malformed(format!("compliance summary: {err}")))?;
            if !summary.apply_report(source, compliant, non_compliant) {
                debug!(policy = %home.qualified_name(), %source, "report unchanged; nothing to merge");
                return Ok(());
            }

            let mut updated = home.clone();
            summary.write_to(&mut updated.status);
            match self.cluster.update_status(updated).await {
                Ok(_) => {
                    info!(
                        policy = %home.qualified_name(),
                        %source,
                        compliant,
                        non_compliant,
                        "merged regional report into home record"
                    );
                    return Ok(());
                }
                Err(ClusterError::VersionConflict { .. }) => {
                    debug!(policy = %home.qualified_name(), "merge conflicted; refetching");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(AggregateError::ConflictExhausted {
            name: name.to_string(),
            attempts: self.max_conflict_retries,
        })
    }
}

impl Reconciler for PolicyAggregator {
    fn name(&self) -> &str {
        "policy-aggregator"
    }

    fn kind(&self) -> ResourceKind {
        kinds::policies()
    }

    async fn reconcile(&self, obj: Object) -> Result<(), AggregateError> {
        let namespace = obj
            .namespace
            .clone()
            .ok_or_else(|| AggregateError::Malformed("policy without namespace".to_string()))?;

        // Provenance bootstrap: an unlabeled policy becomes
        // self-identifying; no aggregation this cycle.
        let Some(origin) = origin_namespace(&obj).map(str::to_string) else {
            let mut labeled = obj.clone();
            labeled
                .labels
                .insert(ORIGIN_NAMESPACE_LABEL.to_string(), namespace.clone());
            self.cluster.update(labeled).await?;
            info!(policy = %obj.qualified_name(), "recorded origin namespace");
            return Ok(());
        };

        // Self-skip: the home copy never aggregates into itself.
        if origin == namespace {
            debug!(policy = %obj.qualified_name(), "home copy; skipping aggregation");
            return Ok(());
        }

        let Some((compliant, non_compliant)) = Self::count_report(&obj)? else {
            debug!(policy = %obj.qualified_name(), "report has no per-cluster status yet");
            return Ok(());
        };

        self.merge_into_home(&origin, &namespace, &obj.name, compliant, non_compliant)
            .await
    }
}
