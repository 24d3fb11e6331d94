//! The provenance label: loop prevention and source identification.
//!
//! Every object the syncer replicates carries a label recording the
//! namespace it originated from. An object whose label equals its own
//! namespace is an origin copy; an object whose label differs is a
//! replica and must never itself trigger further replication. The label
//! key is part of the interop contract: external consumers of replicated
//! or aggregated objects must preserve it.

use crate::object::Object;

/// Label key recording the namespace an object originated from.
pub const ORIGIN_NAMESPACE_LABEL: &str = "hubsync.io/origin-namespace";

/// The origin namespace recorded on an object, if any.
pub fn origin_namespace(obj: &Object) -> Option<&str> {
    obj.labels.get(ORIGIN_NAMESPACE_LABEL).map(String::as_str)
}

/// Whether this object is an origin copy rather than a replica.
///
/// Cluster-scoped objects (no namespace) are always origin copies.
/// Namespaced objects qualify only when the provenance label is present
/// and equals the current namespace.
pub fn is_origin_copy(obj: &Object) -> bool {
    let Some(ns) = obj.namespace.as_deref() else {
        return true;
    };
    origin_namespace(obj) == Some(ns)
}
