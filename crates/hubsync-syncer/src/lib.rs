#![warn(missing_docs)]

//! HubSync cross-cluster synchronization engine: the rate-limited work
//! queue, the direction-parametrized sync controller, and the Down/Up
//! replication behaviors.

pub mod controller;
pub mod error;
pub mod queue;
mod spec_sync;
mod status_sync;
pub mod syncer;

pub use controller::SyncController;
pub use error::SyncError;
pub use queue::{QueueConfig, WorkQueue};
pub use syncer::{start_syncer, Syncer, SyncerConfig};

/// Field manager recorded on every force-merge apply the syncer performs.
pub const SYNCER_FIELD_MANAGER: &str = "syncer";
