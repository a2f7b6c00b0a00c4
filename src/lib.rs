//! Reelflow: review pipeline engine for media studio production.
//!
//! This crate moves each piece of studio work through an ordered sequence of
//! human review stages (editor, quality control, scheduler) and keeps the
//! per-role queues fair and first-in, first-out.
//!
//! # Architecture
//!
//! Reelflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports
//!
//! # Modules
//!
//! - [`workflow`]: Task records, reviewer rotation, and the stage state
//!   machine

pub mod workflow;
