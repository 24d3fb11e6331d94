//! HubSync integration test infrastructure.
//!
//! Shared fixtures plus end-to-end suites that exercise the sync engine
//! and the compliance aggregator against in-memory clusters.

pub mod fixtures;

#[cfg(test)]
mod aggregation_integration;
#[cfg(test)]
mod full_stack;
#[cfg(test)]
mod sync_integration;
