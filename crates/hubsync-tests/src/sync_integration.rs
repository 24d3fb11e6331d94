//! Sync engine integration tests: a running syncer pair against
//! in-memory global and regional clusters.

use std::sync::Arc;

use tokio::sync::watch;

use hubsync_api::identity::kinds;
use hubsync_api::profile::HubProfile;
use hubsync_cluster::{Cluster, ClusterError};
use hubsync_syncer::{start_syncer, Syncer, SyncerConfig};

use crate::fixtures::{
    compliance_status, labeled_policy, managed_cluster, policy, settle, wait_for,
};

async fn running_pair(
    region: &str,
) -> (Arc<Cluster>, Arc<Cluster>, Syncer, watch::Sender<bool>) {
    let global = Arc::new(Cluster::new("global"));
    let regional = Arc::new(Cluster::new(region));
    let (stop, shutdown) = watch::channel(false);
    let syncer = start_syncer(
        SyncerConfig {
            upstream: Arc::clone(&global),
            downstream: Arc::clone(&regional),
            syncer_namespace: region.to_string(),
            workers: 2,
        },
        shutdown,
    )
    .await;
    (global, regional, syncer, stop)
}

#[tokio::test]
async fn down_replicates_updates_and_deletes() {
    let (global, regional, _syncer, _stop) = running_pair("region-a").await;

    let created = global
        .create(labeled_policy("team-a", "team-a", "p"))
        .await
        .unwrap();
    wait_for("policy to replicate downstream", || async {
        match regional.get(&kinds::policies(), Some("team-a"), "p").await {
            Ok(replica) => replica.spec == created.spec,
            Err(_) => false,
        }
    })
    .await;

    let mut changed = global
        .get(&kinds::policies(), Some("team-a"), "p")
        .await
        .unwrap();
    changed.spec["remediationAction"] = "enforce".into();
    let changed = global.update(changed).await.unwrap();
    wait_for("spec change to propagate", || async {
        match regional.get(&kinds::policies(), Some("team-a"), "p").await {
            Ok(replica) => replica.spec == changed.spec,
            Err(_) => false,
        }
    })
    .await;

    global
        .delete(&kinds::policies(), Some("team-a"), "p")
        .await
        .unwrap();
    wait_for("delete to propagate", || async {
        matches!(
            regional.get(&kinds::policies(), Some("team-a"), "p").await,
            Err(ClusterError::NotFound { .. })
        )
    })
    .await;
}

#[tokio::test]
async fn down_skips_replica_copies() {
    let (global, regional, _syncer, _stop) = running_pair("region-a").await;

    // A mirror from some other source: label differs from namespace.
    global
        .create(labeled_policy("team-a", "region-b", "p"))
        .await
        .unwrap();
    // An unlabeled object is not an origin copy either.
    global.create(policy("team-a", "q")).await.unwrap();

    settle().await;
    assert!(matches!(
        regional.get(&kinds::policies(), Some("region-b"), "p").await,
        Err(ClusterError::NotFound { .. })
    ));
    assert!(matches!(
        regional.get(&kinds::policies(), Some("team-a"), "q").await,
        Err(ClusterError::NotFound { .. })
    ));
}

#[tokio::test]
async fn up_mirrors_status_into_syncer_namespace() {
    let (global, regional, _syncer, _stop) = running_pair("region-a").await;

    let mut report = regional
        .create(labeled_policy("team-a", "team-a", "p"))
        .await
        .unwrap();
    report.status = compliance_status(&[("c1", "Compliant"), ("c2", "NonCompliant")]);
    let report = regional.update_status(report).await.unwrap();

    // The mirror lands in the syncer's namespace on the global hub and
    // carries the regional status verbatim.
    wait_for("status to mirror upstream", || async {
        match global.get(&kinds::policies(), Some("region-a"), "p").await {
            Ok(mirror) => mirror.status == report.status,
            Err(_) => false,
        }
    })
    .await;
}

#[tokio::test]
async fn up_status_change_overwrites_mirror() {
    let (global, regional, _syncer, _stop) = running_pair("region-a").await;

    let mut report = regional
        .create(labeled_policy("team-a", "team-a", "p"))
        .await
        .unwrap();
    report.status = compliance_status(&[("c1", "NonCompliant")]);
    regional.update_status(report).await.unwrap();

    wait_for("initial mirror", || async {
        global
            .get(&kinds::policies(), Some("region-a"), "p")
            .await
            .is_ok()
    })
    .await;

    let mut report = regional
        .get(&kinds::policies(), Some("team-a"), "p")
        .await
        .unwrap();
    report.status = compliance_status(&[("c1", "Compliant")]);
    let report = regional.update_status(report).await.unwrap();

    wait_for("mirror to follow the status change", || async {
        match global.get(&kinds::policies(), Some("region-a"), "p").await {
            Ok(mirror) => mirror.status == report.status,
            Err(_) => false,
        }
    })
    .await;
}

#[tokio::test]
async fn up_synthesizes_hub_profile_from_registrations() {
    let (global, regional, _syncer, _stop) = running_pair("region-a").await;

    regional.create(managed_cluster("c2")).await.unwrap();
    regional.create(managed_cluster("c1")).await.unwrap();

    wait_for("profile to list both clusters", || async {
        match global.get(&kinds::hub_profiles(), None, "region-a").await {
            Ok(obj) => match HubProfile::from_object(&obj) {
                Ok(profile) => {
                    profile.managed_clusters == vec!["c1".to_string(), "c2".to_string()]
                }
                Err(_) => false,
            },
            Err(_) => false,
        }
    })
    .await;

    // Cluster registrations are mirrored as objects too.
    wait_for("cluster records to mirror upstream", || async {
        global
            .get(&kinds::managed_clusters(), None, "c1")
            .await
            .is_ok()
    })
    .await;
}
