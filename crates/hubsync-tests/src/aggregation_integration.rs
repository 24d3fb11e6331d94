//! Aggregation controller integration tests: a running
//! `GenericController` driving the policy aggregator on one hub.

use std::sync::Arc;

use tokio::sync::watch;

use hubsync_aggregator::{GenericController, PolicyAggregator};
use hubsync_api::compliance::ComplianceSummary;
use hubsync_api::identity::kinds;
use hubsync_api::provenance::ORIGIN_NAMESPACE_LABEL;
use hubsync_cluster::Cluster;

use crate::fixtures::{compliance_status, labeled_policy, policy, settle, wait_for};

async fn running_aggregator(cluster: &Arc<Cluster>) -> watch::Sender<bool> {
    let (stop, shutdown) = watch::channel(false);
    GenericController::start(
        Arc::clone(cluster),
        PolicyAggregator::new(Arc::clone(cluster)),
        2,
        shutdown,
    )
    .await;
    stop
}

async fn totals_of(cluster: &Cluster, ns: &str, name: &str) -> Option<(u32, u32)> {
    let home = cluster.get(&kinds::policies(), Some(ns), name).await.ok()?;
    let summary = ComplianceSummary::from_status(&home.status).ok()?;
    Some((summary.compliant, summary.non_compliant))
}

#[tokio::test]
async fn bootstraps_provenance_on_unlabeled_policies() {
    let cluster = Arc::new(Cluster::new("global"));
    let _stop = running_aggregator(&cluster).await;

    cluster.create(policy("team-a", "p")).await.unwrap();

    wait_for("origin label to appear", || async {
        match cluster.get(&kinds::policies(), Some("team-a"), "p").await {
            Ok(obj) => {
                obj.labels.get(ORIGIN_NAMESPACE_LABEL).map(String::as_str) == Some("team-a")
            }
            Err(_) => false,
        }
    })
    .await;
}

#[tokio::test]
async fn merges_reports_into_home_record() {
    let cluster = Arc::new(Cluster::new("global"));
    let _stop = running_aggregator(&cluster).await;

    cluster.create(policy("team-a", "p")).await.unwrap();

    let mut first = labeled_policy("team-a", "region-a", "p");
    first.status = compliance_status(&[
        ("c1", "Compliant"),
        ("c2", "Compliant"),
        ("c3", "Compliant"),
        ("c4", "NonCompliant"),
    ]);
    cluster.create(first).await.unwrap();
    wait_for("first report to merge", || async {
        totals_of(&cluster, "team-a", "p").await == Some((3, 1))
    })
    .await;

    let mut second = labeled_policy("team-a", "region-b", "p");
    second.status = compliance_status(&[("d1", "Compliant"), ("d2", "Compliant")]);
    cluster.create(second).await.unwrap();
    wait_for("second source to merge", || async {
        totals_of(&cluster, "team-a", "p").await == Some((5, 1))
    })
    .await;

    let mut changed = cluster
        .get(&kinds::policies(), Some("region-a"), "p")
        .await
        .unwrap();
    changed.status = compliance_status(&[
        ("c1", "Compliant"),
        ("c2", "NonCompliant"),
        ("c3", "NonCompliant"),
        ("c4", "NonCompliant"),
    ]);
    cluster.update_status(changed).await.unwrap();
    wait_for("changed report to move totals by the delta", || async {
        totals_of(&cluster, "team-a", "p").await == Some((3, 4))
    })
    .await;

    let home = cluster
        .get(&kinds::policies(), Some("team-a"), "p")
        .await
        .unwrap();
    let summary = ComplianceSummary::from_status(&home.status).unwrap();
    assert_eq!(summary.summaries.len(), 2);
}

#[tokio::test]
async fn redelivered_report_does_not_double_count() {
    let cluster = Arc::new(Cluster::new("global"));
    let _stop = running_aggregator(&cluster).await;

    cluster.create(policy("team-a", "p")).await.unwrap();
    let mut report = labeled_policy("team-a", "region-a", "p");
    report.status = compliance_status(&[("c1", "Compliant"), ("c2", "Compliant")]);
    cluster.create(report).await.unwrap();
    wait_for("report to merge", || async {
        totals_of(&cluster, "team-a", "p").await == Some((2, 0))
    })
    .await;

    // Touching the report without changing its status re-delivers it to
    // the aggregator; the merge must be a no-op.
    let mut touched = cluster
        .get(&kinds::policies(), Some("region-a"), "p")
        .await
        .unwrap();
    touched.labels.insert("touched".to_string(), "yes".to_string());
    cluster.update(touched).await.unwrap();

    settle().await;
    assert_eq!(totals_of(&cluster, "team-a", "p").await, Some((2, 0)));
    let home = cluster
        .get(&kinds::policies(), Some("team-a"), "p")
        .await
        .unwrap();
    let summary = ComplianceSummary::from_status(&home.status).unwrap();
    assert_eq!(summary.summaries.len(), 1);
}

#[tokio::test]
async fn report_arriving_before_home_record_merges_once_it_exists() {
    let cluster = Arc::new(Cluster::new("global"));
    let _stop = running_aggregator(&cluster).await;

    let mut report = labeled_policy("team-a", "region-a", "p");
    report.status = compliance_status(&[("c1", "NonCompliant")]);
    cluster.create(report).await.unwrap();

    settle().await;
    // The report never creates the home record on its own.
    assert!(cluster
        .get(&kinds::policies(), Some("team-a"), "p")
        .await
        .is_err());

    cluster.create(policy("team-a", "p")).await.unwrap();
    wait_for("retried report to merge after the record appears", || async {
        totals_of(&cluster, "team-a", "p").await == Some((0, 1))
    })
    .await;
}
