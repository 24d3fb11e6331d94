//! The synthesized per-regional-hub profile object.
//!
//! One profile per regional hub summarizes that hub's registered managed
//! clusters and installed add-ons. The syncer rebuilds it from the
//! current watch-cache contents on every relevant change, so it is
//! internally consistent even though its inputs update independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::kinds;
use crate::object::Object;

/// Spec of a hub profile object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HubProfile {
    /// API endpoint of the regional hub.
    pub endpoint: String,
    /// Names of managed clusters registered with the hub, sorted.
    pub managed_clusters: Vec<String>,
    /// Names of add-ons installed on the hub, sorted.
    pub addons: Vec<String>,
}

impl HubProfile {
    /// Build the cluster-scoped profile object named after the reporting
    /// syncer's namespace.
    pub fn into_object(self, name: &str) -> Object {
        let mut obj = Object::new(kinds::hub_profiles(), None, name);
        obj.spec = serde_json::to_value(&self).unwrap_or(Value::Null);
        obj
    }

    /// Read a profile back out of an object's spec.
    pub fn from_object(obj: &Object) -> Result<Self, serde_json::Error> {
        serde_json::from_value(obj.spec.clone())
    }
}
