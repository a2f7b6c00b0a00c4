//! Shared world state for review pipeline BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use reelflow::workflow::{
    adapters::memory::InMemoryTaskStore,
    domain::Task,
    services::{WorkflowEngine, WorkflowEngineError, WorkflowNotification},
};
use rstest::fixture;
use tokio::sync::broadcast;

/// Engine type used by the BDD world.
pub type TestEngine = WorkflowEngine<InMemoryTaskStore, DefaultClock>;

/// Scenario world for review pipeline behaviour tests.
#[derive(Default)]
pub struct ReviewPipelineWorld {
    pub engine: Option<TestEngine>,
    pub notifications: Option<broadcast::Receiver<WorkflowNotification>>,
    pub root_task: Option<Task>,
    pub latest_task: Option<Task>,
    pub last_result: Option<Result<Task, WorkflowEngineError>>,
}

impl ReviewPipelineWorld {
    /// Returns the engine configured by a given step.
    ///
    /// # Errors
    ///
    /// Returns an error when no studio has been configured.
    pub fn engine(&self) -> Result<&TestEngine, eyre::Report> {
        self.engine
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing studio engine in scenario world"))
    }

    /// Returns the most recently produced task.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been created yet.
    pub fn latest_task(&self) -> Result<&Task, eyre::Report> {
        self.latest_task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing latest task in scenario world"))
    }

    /// Records a transition outcome, advancing the latest task on success.
    pub fn record(&mut self, result: Result<Task, WorkflowEngineError>) {
        if let Ok(ref task) = result {
            self.latest_task = Some(task.clone());
        }
        self.last_result = Some(result);
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReviewPipelineWorld {
    ReviewPipelineWorld::default()
}

/// Builds an engine over a fresh in-memory store.
pub fn new_engine(config: reelflow::workflow::config::WorkflowConfig) -> TestEngine {
    WorkflowEngine::new(
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(DefaultClock),
        config,
    )
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
