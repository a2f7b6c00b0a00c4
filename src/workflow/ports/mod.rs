//! Port contracts for the review pipeline.
//!
//! Ports define infrastructure-agnostic interfaces used by the engine.

pub mod store;

pub use store::{TaskChange, TaskStore, TaskStoreError, TaskStoreResult};
