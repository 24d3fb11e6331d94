#![warn(missing_docs)]

//! HubSync cluster API: an in-memory versioned object store with watch
//! feeds, plus the read-mostly watch cache the controllers reconcile from.

pub mod cache;
pub mod error;
pub mod store;

pub use cache::WatchCache;
pub use error::ClusterError;
pub use store::{Cluster, WatchEvent};
