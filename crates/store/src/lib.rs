//! Concurrent in-memory measurement store.
//!
//! [`DataStore`] maps patient ids to their measurement history, rejects
//! duplicate submissions, keeps running statistics and notifies registered
//! [`StoreListener`]s about every accepted record. It is designed to be
//! shared via `Arc<DataStore>` between the readers that feed it and the
//! evaluators that query it.

pub mod listener;
pub mod stats;
pub mod store;

pub use listener::{ListenerId, StoreListener};
pub use stats::StoreStatistics;
pub use store::{AddOutcome, DataStore};
