//! Application services for the review pipeline.

mod engine;

pub use engine::{
    CreateRootTaskRequest, WorkflowEngine, WorkflowEngineError, WorkflowEngineResult,
    WorkflowNotification,
};
