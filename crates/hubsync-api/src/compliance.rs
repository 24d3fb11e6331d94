//! Compliance status projections and the delta-merge summary.
//!
//! A policy's status carries one compliance entry per managed cluster.
//! The aggregator folds each regional report into a [`ComplianceSummary`]
//! on the home record: the per-source entry is replaced with the new
//! counts while the totals absorb only the delta, so re-delivery of an
//! unchanged report is a no-op and merges from distinct sources commute.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the compliance summary inside an object's status subtree.
pub const COMPLIANCE_SUMMARY_KEY: &str = "complianceSummary";

/// Key of the per-cluster compliance list inside an object's status.
pub const CLUSTER_STATUS_KEY: &str = "status";

/// Compliance state reported for one managed cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplianceState {
    /// The cluster satisfies the policy.
    Compliant,
    /// The cluster violates the policy.
    NonCompliant,
    /// Any other reported state; excluded from counts.
    Unknown(String),
}

impl ComplianceState {
    /// Parse the wire form of a compliance state.
    pub fn parse(s: &str) -> Self {
        match s {
            "Compliant" => ComplianceState::Compliant,
            "NonCompliant" => ComplianceState::NonCompliant,
            other => ComplianceState::Unknown(other.to_string()),
        }
    }
}

/// One per-managed-cluster compliance entry from a policy status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterCompliance {
    /// Name of the reporting managed cluster.
    pub cluster_name: String,
    /// Reported state, in wire form.
    pub compliance_state: String,
}

impl Default for ClusterCompliance {
    fn default() -> Self {
        Self {
            cluster_name: String::new(),
            compliance_state: String::new(),
        }
    }
}

impl ClusterCompliance {
    /// The parsed compliance state.
    pub fn state(&self) -> ComplianceState {
        ComplianceState::parse(&self.compliance_state)
    }

    /// Extract the per-cluster entries from a status subtree. A missing
    /// or null list yields an empty vector; malformed entries are an
    /// error (schema mismatch, not a transient condition).
    pub fn list_from_status(status: &Value) -> Result<Vec<ClusterCompliance>, serde_json::Error> {
        match status.get(CLUSTER_STATUS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(list) => serde_json::from_value(list.clone()),
        }
    }
}

/// The last-reported counts for one source (a regional hub namespace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceSummary {
    /// Reporting source identity.
    pub name: String,
    /// Clusters reported compliant by this source.
    pub compliant: u32,
    /// Clusters reported non-compliant by this source.
    pub non_compliant: u32,
}

/// Aggregated compliance counts over all reporting sources.
///
/// Invariants: `compliant`/`non_compliant` always equal the sum over
/// `summaries`, and at most one entry exists per source name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplianceSummary {
    /// Total compliant clusters across all sources.
    pub compliant: u32,
    /// Total non-compliant clusters across all sources.
    pub non_compliant: u32,
    /// Per-source breakdown, one entry per reporting source.
    pub summaries: Vec<SourceSummary>,
}

impl ComplianceSummary {
    /// Read the summary out of a status subtree; absent means empty.
    pub fn from_status(status: &Value) -> Result<Self, serde_json::Error> {
        match status.get(COMPLIANCE_SUMMARY_KEY) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(v) => serde_json::from_value(v.clone()),
        }
    }

    /// Write the summary back into a status subtree, creating the status
    /// object if the subtree is not yet a map.
    pub fn write_to(&self, status: &mut Value) {
        if !status.is_object() {
            *status = Value::Object(serde_json::Map::new());
        }
        if let Some(map) = status.as_object_mut() {
            map.insert(
                COMPLIANCE_SUMMARY_KEY.to_string(),
                serde_json::to_value(self).unwrap_or(Value::Null),
            );
        }
    }

    /// Fold one source's newly-reported counts into the aggregate.
    ///
    /// The per-source entry is replaced with the new counts; the totals
    /// move by the difference from that source's previous counts. Returns
    /// true when the aggregate changed.
    pub fn apply_report(&mut self, source: &str, compliant: u32, non_compliant: u32) -> bool {
        if let Some(entry) = self.summaries.iter_mut().find(|s| s.name == source) {
            if entry.compliant == compliant && entry.non_compliant == non_compliant {
                return false;
            }
            self.compliant = self.compliant.saturating_sub(entry.compliant) + compliant;
            self.non_compliant =
                self.non_compliant.saturating_sub(entry.non_compliant) + non_compliant;
            entry.compliant = compliant;
            entry.non_compliant = non_compliant;
        } else {
            self.compliant += compliant;
            self.non_compliant += non_compliant;
            self.summaries.push(SourceSummary {
                name: source.to_string(),
                compliant,
                non_compliant,
            });
        }
        true
    }
}
