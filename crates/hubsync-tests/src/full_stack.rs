//! Full-stack scenario: two regional hubs with running syncers, plus the
//! aggregation controller on the global hub. A policy authored on the
//! global hub fans out to the regions; regional compliance flows back up
//! and is folded into the home record.

use std::sync::Arc;

use tokio::sync::watch;

use hubsync_aggregator::{GenericController, PolicyAggregator};
use hubsync_api::compliance::ComplianceSummary;
use hubsync_api::identity::kinds;
use hubsync_cluster::Cluster;
use hubsync_syncer::{start_syncer, SyncerConfig};

use crate::fixtures::{compliance_status, policy, wait_for};

struct Hub {
    global: Arc<Cluster>,
    regions: Vec<Arc<Cluster>>,
    _stop: watch::Sender<bool>,
}

async fn running_hub(region_names: &[&str]) -> Hub {
    let global = Arc::new(Cluster::new("global"));
    let (stop, shutdown) = watch::channel(false);

    let mut regions = Vec::new();
    for name in region_names {
        let regional = Arc::new(Cluster::new(name));
        start_syncer(
            SyncerConfig {
                upstream: Arc::clone(&global),
                downstream: Arc::clone(&regional),
                syncer_namespace: name.to_string(),
                workers: 2,
            },
            shutdown.clone(),
        )
        .await;
        regions.push(regional);
    }

    GenericController::start(
        Arc::clone(&global),
        PolicyAggregator::new(Arc::clone(&global)),
        2,
        shutdown,
    )
    .await;

    Hub {
        global,
        regions,
        _stop: stop,
    }
}

async fn set_regional_compliance(
    regional: &Cluster,
    ns: &str,
    name: &str,
    entries: &[(&str, &str)],
) {
    let mut replica = regional.get(&kinds::policies(), Some(ns), name).await.unwrap();
    replica.status = compliance_status(entries);
    regional.update_status(replica).await.unwrap();
}

async fn home_summary(global: &Cluster, ns: &str, name: &str) -> Option<ComplianceSummary> {
    let home = global.get(&kinds::policies(), Some(ns), name).await.ok()?;
    ComplianceSummary::from_status(&home.status).ok()
}

#[tokio::test]
async fn policy_round_trip_through_two_regions() {
    let hub = running_hub(&["region-a", "region-b"]).await;

    // Author the policy on the global hub. The aggregator bootstraps its
    // provenance, which makes it an origin copy the syncers replicate.
    hub.global.create(policy("team-a", "p")).await.unwrap();
    for regional in &hub.regions {
        wait_for("policy to reach the region", || async {
            regional.get(&kinds::policies(), Some("team-a"), "p").await.is_ok()
        })
        .await;
    }

    set_regional_compliance(
        &hub.regions[0],
        "team-a",
        "p",
        &[
            ("c1", "Compliant"),
            ("c2", "Compliant"),
            ("c3", "Compliant"),
            ("c4", "NonCompliant"),
        ],
    )
    .await;
    wait_for("region-a compliance to land on the home record", || async {
        home_summary(&hub.global, "team-a", "p")
            .await
            .is_some_and(|s| (s.compliant, s.non_compliant) == (3, 1))
    })
    .await;

    set_regional_compliance(
        &hub.regions[1],
        "team-a",
        "p",
        &[("d1", "Compliant"), ("d2", "Compliant")],
    )
    .await;
    wait_for("region-b compliance to land on the home record", || async {
        home_summary(&hub.global, "team-a", "p")
            .await
            .is_some_and(|s| (s.compliant, s.non_compliant) == (5, 1))
    })
    .await;

    // Compliance shifts in region-a: totals move by the delta while
    // region-b's contribution is untouched.
    set_regional_compliance(
        &hub.regions[0],
        "team-a",
        "p",
        &[
            ("c1", "Compliant"),
            ("c2", "NonCompliant"),
            ("c3", "NonCompliant"),
            ("c4", "NonCompliant"),
        ],
    )
    .await;
    wait_for("shifted compliance to settle", || async {
        home_summary(&hub.global, "team-a", "p")
            .await
            .is_some_and(|s| (s.compliant, s.non_compliant) == (3, 4))
    })
    .await;

    let summary = home_summary(&hub.global, "team-a", "p").await.unwrap();
    assert_eq!(summary.summaries.len(), 2);
    let a = summary.summaries.iter().find(|s| s.name == "region-a").unwrap();
    assert_eq!((a.compliant, a.non_compliant), (1, 3));
    let b = summary.summaries.iter().find(|s| s.name == "region-b").unwrap();
    assert_eq!((b.compliant, b.non_compliant), (2, 0));
}

#[tokio::test]
async fn spec_edits_propagate_without_disturbing_aggregates() {
    let hub = running_hub(&["region-a"]).await;

    hub.global.create(policy("team-a", "p")).await.unwrap();
    wait_for("policy to reach the region", || async {
        hub.regions[0]
            .get(&kinds::policies(), Some("team-a"), "p")
            .await
            .is_ok()
    })
    .await;

    set_regional_compliance(&hub.regions[0], "team-a", "p", &[("c1", "Compliant")]).await;
    wait_for("compliance to aggregate", || async {
        home_summary(&hub.global, "team-a", "p")
            .await
            .is_some_and(|s| (s.compliant, s.non_compliant) == (1, 0))
    })
    .await;

    // Edit the spec at the source of truth.
    let mut edited = hub
        .global
        .get(&kinds::policies(), Some("team-a"), "p")
        .await
        .unwrap();
    edited.spec["remediationAction"] = "enforce".into();
    let edited = hub.global.update(edited).await.unwrap();

    wait_for("spec edit to propagate", || async {
        match hub.regions[0]
            .get(&kinds::policies(), Some("team-a"), "p")
            .await
        {
            Ok(replica) => replica.spec == edited.spec,
            Err(_) => false,
        }
    })
    .await;

    // The regional replica keeps its status through the spec overwrite,
    // and the aggregate stays put.
    let replica = hub.regions[0]
        .get(&kinds::policies(), Some("team-a"), "p")
        .await
        .unwrap();
    assert_eq!(replica.status, compliance_status(&[("c1", "Compliant")]));
    let summary = home_summary(&hub.global, "team-a", "p").await.unwrap();
    assert_eq!((summary.compliant, summary.non_compliant), (1, 0));
}
