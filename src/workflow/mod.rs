//! Review pipeline orchestration for studio production work.
//!
//! A unit of work moves through editing, quality-control review, and
//! scheduling. Finishing a stage synthesises the next stage's task, assigns
//! it through a round-robin rotation, and keeps every role queue in FIFO
//! order. Rejected work loops back to the editor who produced it, carrying
//! the reviewer's reason. The module follows hexagonal architecture:
//!
//! - Domain types and the pure state machine in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Configuration in [`config`]
//! - The orchestration service in [`services`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
