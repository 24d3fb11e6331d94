//! Object builders and polling helpers shared across the suites.

use std::future::Future;
use std::time::Duration;

use serde_json::{json, Value};

use hubsync_api::identity::kinds;
use hubsync_api::object::Object;
use hubsync_api::provenance::ORIGIN_NAMESPACE_LABEL;

/// A policy with a non-trivial spec, without provenance.
pub fn policy(namespace: &str, name: &str) -> Object {
    let mut obj = Object::new(kinds::policies(), Some(namespace), name);
    obj.spec = json!({
        "remediationAction": "inform",
        "disabled": false,
    });
    obj
}

/// A policy carrying an explicit origin-namespace label.
pub fn labeled_policy(origin: &str, namespace: &str, name: &str) -> Object {
    let mut obj = policy(namespace, name);
    obj.labels
        .insert(ORIGIN_NAMESPACE_LABEL.to_string(), origin.to_string());
    obj
}

/// A cluster-scoped managed cluster record.
pub fn managed_cluster(name: &str) -> Object {
    let mut obj = Object::new(kinds::managed_clusters(), None, name);
    obj.spec = json!({"hubAcceptsClient": true});
    obj
}

/// A per-cluster compliance status subtree for `(cluster, state)` pairs.
pub fn compliance_status(entries: &[(&str, &str)]) -> Value {
    let list: Vec<_> = entries
        .iter()
        .map(|(cluster, state)| json!({"clusterName": cluster, "complianceState": state}))
        .collect();
    json!({ "status": list })
}

/// Poll `check` until it returns true, panicking with `what` after the
/// deadline. Controllers converge within milliseconds; the budget is
/// generous for loaded CI machines.
pub async fn wait_for<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..250 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Sleep long enough for any pending controller work to surface. Used to
/// assert that something did NOT happen.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}
