//! Unit tests for the review pipeline.

mod engine_tests;
mod support;
