#![warn(missing_docs)]

//! HubSync compliance aggregation: the generic reconciliation controller
//! and the policy aggregator that merges regional compliance reports
//! into the home record under optimistic-concurrency retry.

pub mod error;
pub mod generic;
pub mod policy;

pub use error::AggregateError;
pub use generic::{GenericController, Reconciler};
pub use policy::PolicyAggregator;
