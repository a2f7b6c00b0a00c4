//! In-memory adapters for the review pipeline.

mod store;

pub use store::InMemoryTaskStore;
