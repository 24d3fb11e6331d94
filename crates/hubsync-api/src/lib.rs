#![warn(missing_docs)]

//! HubSync data model: resource identities, the generic object document,
//! provenance labels, and compliance summary types shared by the syncer
//! and the aggregation controller.

pub mod compliance;
pub mod identity;
pub mod object;
pub mod profile;
pub mod provenance;
