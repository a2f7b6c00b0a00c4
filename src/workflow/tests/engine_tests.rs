//! Service tests for the workflow engine: retries, atomicity, notifications,
//! and serialisation of concurrent transitions.

use std::collections::HashSet;
use std::sync::Arc;

use crate::workflow::{
    adapters::memory::InMemoryTaskStore,
    config::{RetryPolicy, WorkflowConfig},
    domain::{
        AssignmentError, PersistedTaskData, QueuePosition, ReviewerId, ReviewerRoster, Role,
        Stage, Task, TaskId, TaskStatus, WorkflowDomainError, WorkflowSequence,
    },
    ports::{TaskChange, TaskStore, TaskStoreError, TaskStoreResult},
    services::{CreateRootTaskRequest, WorkflowEngine, WorkflowEngineError, WorkflowNotification},
};
use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use rstest::{fixture, rstest};
use tokio::sync::broadcast;

use super::support::{file, reviewer, studio_config, studio_roster};

type TestEngine = WorkflowEngine<InMemoryTaskStore, DefaultClock>;

mockall::mock! {
    pub Store {}

    #[async_trait]
    impl TaskStore for Store {
        async fn get(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;
        async fn put(&self, task: &Task) -> TaskStoreResult<()>;
        async fn commit(&self, tasks: &[Task]) -> TaskStoreResult<()>;
        async fn list_by_assignee(&self, reviewer: &ReviewerId) -> TaskStoreResult<Vec<Task>>;
        async fn list_by_role(&self, role: Role, status: TaskStatus) -> TaskStoreResult<Vec<Task>>;
        async fn list_by_origin(&self, origin: TaskId) -> TaskStoreResult<Vec<Task>>;
        fn subscribe(&self) -> broadcast::Receiver<TaskChange>;
    }
}

#[fixture]
fn store() -> Arc<InMemoryTaskStore> {
    Arc::new(InMemoryTaskStore::new())
}

fn engine_over(store: &Arc<InMemoryTaskStore>, config: WorkflowConfig) -> TestEngine {
    WorkflowEngine::new(Arc::clone(store), Arc::new(DefaultClock), config)
}

async fn root_task(engine: &TestEngine, title: &str) -> Task {
    engine
        .create_root_task(
            CreateRootTaskRequest::new(title)
                .with_editor(reviewer("erin"))
                .with_files([file("raw.mov", "erin")]),
        )
        .await
        .expect("root task creation should succeed")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_commit_failures_are_retried(
    store: Arc<InMemoryTaskStore>,
) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config());
    let root = root_task(&engine, "Teaser").await;
    let before = engine.sequence().await;
    store.fail_next_commits(2);

    let qc = engine.submit_for_review(root.id(), Vec::new()).await?;

    eyre::ensure!(qc.queue_position() == before.peek_position());
    let after = engine.sequence().await;
    eyre::ensure!(after.peek_position().value() == before.peek_position().value() + 1);
    eyre::ensure!(after.peek_rotation() == before.peek_rotation() + 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_retries_surface_store_unavailable_without_partial_state(
    store: Arc<InMemoryTaskStore>,
) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config());
    let root = root_task(&engine, "Teaser").await;
    let before = engine.sequence().await;
    store.fail_next_commits(10);

    let result = engine.submit_for_review(root.id(), Vec::new()).await;

    eyre::ensure!(matches!(
        result,
        Err(WorkflowEngineError::StoreUnavailable { attempts: 3, .. })
    ));
    store.fail_next_commits(0);
    eyre::ensure!(engine.get_task(root.id()).await? == root);
    eyre::ensure!(
        engine
            .queue_for_role(Role::Qc, TaskStatus::Pending)
            .await?
            .is_empty()
    );
    eyre::ensure!(store.len() == 1);
    eyre::ensure!(engine.sequence().await == before);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unavailable_reads_are_retried_up_to_the_budget() {
    let mut mock = MockStore::new();
    mock.expect_get()
        .times(4)
        .returning(|_| Err(TaskStoreError::Unavailable("replica lagging".to_owned())));
    mock.expect_commit().never();
    let engine = WorkflowEngine::new(
        Arc::new(mock),
        Arc::new(DefaultClock),
        WorkflowConfig::new(studio_roster()).with_retry(RetryPolicy::immediate(4)),
    );

    let result = engine.approve(TaskId::new(), None).await;

    assert!(matches!(
        result,
        Err(WorkflowEngineError::StoreUnavailable {
            attempts: 4,
            source: TaskStoreError::Unavailable(_),
        })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persistence_failures_are_not_retried() {
    let mut mock = MockStore::new();
    mock.expect_get()
        .times(1)
        .returning(|_| Err(TaskStoreError::persistence(std::io::Error::other("corrupt"))));
    let engine = WorkflowEngine::new(Arc::new(mock), Arc::new(DefaultClock), studio_config());

    let result = engine.confirm_scheduled(TaskId::new()).await;

    assert!(matches!(
        result,
        Err(WorkflowEngineError::Store(TaskStoreError::Persistence(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn business_rule_errors_write_nothing(store: Arc<InMemoryTaskStore>) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config());
    let root = root_task(&engine, "Teaser").await;
    let qc = engine.submit_for_review(root.id(), Vec::new()).await?;
    let before = engine.sequence().await;

    let result = engine.reject(qc.id(), "   ").await;

    eyre::ensure!(matches!(
        result,
        Err(WorkflowEngineError::Domain(WorkflowDomainError::MissingFeedback))
    ));
    eyre::ensure!(engine.get_task(qc.id()).await?.status() == TaskStatus::Pending);
    eyre::ensure!(store.len() == 2);
    eyre::ensure!(engine.sequence().await == before);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_roster_fails_the_operation(store: Arc<InMemoryTaskStore>) -> eyre::Result<()> {
    let roster = ReviewerRoster::new().with_role(Role::Editor, [reviewer("erin")]);
    let engine = engine_over(&store, WorkflowConfig::new(roster));
    let root = root_task(&engine, "Teaser").await;

    let result = engine.submit_for_review(root.id(), Vec::new()).await;

    eyre::ensure!(matches!(
        result,
        Err(WorkflowEngineError::Assignment(
            AssignmentError::NoReviewersAvailable(Role::Qc)
        ))
    ));
    eyre::ensure!(engine.get_task(root.id()).await?.status() == TaskStatus::Pending);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_task_is_reported(store: Arc<InMemoryTaskStore>) {
    let engine = engine_over(&store, studio_config());
    let missing = TaskId::new();

    let result = engine.submit_for_review(missing, vec![file("cut.mp4", "erin")]).await;

    assert!(matches!(result, Err(WorkflowEngineError::TaskNotFound(id)) if id == missing));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn root_task_without_editor_draws_from_rotation(
    store: Arc<InMemoryTaskStore>,
) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config())
        .with_sequence(WorkflowSequence::starting_at(100, 1));

    let task = engine
        .create_root_task(CreateRootTaskRequest::new("Bumper").with_description("10s sting"))
        .await?;

    eyre::ensure!(task.assigned_to() == &reviewer("eli"));
    eyre::ensure!(task.queue_position() == QueuePosition::new(100));
    eyre::ensure!(task.description() == "10s sting");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn start_task_marks_work_in_progress(store: Arc<InMemoryTaskStore>) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config());
    let root = root_task(&engine, "Teaser").await;

    let started = engine.start_task(root.id()).await?;
    eyre::ensure!(started.status() == TaskStatus::InProgress);
    eyre::ensure!(engine.get_task(root.id()).await? == started);

    let qc = engine.submit_for_review(root.id(), Vec::new()).await?;
    eyre::ensure!(qc.stage() == Stage::QcReview);
    let again = engine.start_task(root.id()).await;
    eyre::ensure!(matches!(
        again,
        Err(WorkflowEngineError::Domain(
            WorkflowDomainError::InvalidTransition { .. }
        ))
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejection_without_editing_ancestor_is_reported(
    store: Arc<InMemoryTaskStore>,
) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config());
    let now = DefaultClock.utc();
    let orphan_id = TaskId::new();
    let orphan = Task::from_persisted(PersistedTaskData {
        id: orphan_id,
        title: "Imported review".to_owned(),
        description: String::new(),
        stage: Stage::QcReview,
        status: TaskStatus::Pending,
        assigned_to: reviewer("quinn"),
        assigned_role: Role::Qc,
        queue_position: QueuePosition::new(1),
        created_at: now,
        due_date: now,
        updated_at: now,
        parent_task_id: Some(TaskId::new()),
        origin_task_id: orphan_id,
        attached_files: vec![file("cut.mp4", "erin")],
        feedback: None,
        rejection_reason: None,
    })?;
    store.put(&orphan).await?;

    let result = engine.reject(orphan_id, "audio clipping").await;

    eyre::ensure!(matches!(
        result,
        Err(WorkflowEngineError::OriginalEditorNotFound(id)) if id == orphan_id
    ));
    eyre::ensure!(engine.get_task(orphan_id).await?.status() == TaskStatus::Pending);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn notifications_follow_commits_in_order(store: Arc<InMemoryTaskStore>) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config());
    let root = root_task(&engine, "Teaser").await;
    let mut notifications = engine.subscribe();

    let qc = engine.submit_for_review(root.id(), Vec::new()).await?;
    let scheduling = engine.approve(qc.id(), Some("ship it".to_owned())).await?;
    engine.confirm_scheduled(scheduling.id()).await?;

    let WorkflowNotification::TasksCommitted { tasks } = notifications.recv().await? else {
        eyre::bail!("expected submit commit first");
    };
    let ids: Vec<_> = tasks.iter().map(Task::id).collect();
    eyre::ensure!(ids == [root.id(), qc.id()]);

    let second = notifications.recv().await?;
    eyre::ensure!(matches!(second, WorkflowNotification::TasksCommitted { .. }));

    let WorkflowNotification::TasksCommitted { tasks } = notifications.recv().await? else {
        eyre::bail!("expected confirm commit before completion");
    };
    eyre::ensure!(tasks.len() == 1);

    let completed = notifications.recv().await?;
    eyre::ensure!(
        completed
            == WorkflowNotification::WorkflowCompleted {
                origin_task_id: root.id(),
                completed_task_id: scheduling.id(),
            }
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transitions_draw_unique_positions(
    store: Arc<InMemoryTaskStore>,
) -> eyre::Result<()> {
    let engine = engine_over(&store, studio_config());
    let mut roots = Vec::new();
    for index in 0..16 {
        roots.push(root_task(&engine, &format!("Short {index}")).await);
    }
    let before = engine.sequence().await;

    let handles: Vec<_> = roots
        .iter()
        .map(|root| {
            let worker = engine.clone();
            let root_id = root.id();
            tokio::spawn(async move { worker.submit_for_review(root_id, Vec::new()).await })
        })
        .collect();

    let mut positions = HashSet::new();
    for handle in handles {
        let qc = handle.await??;
        eyre::ensure!(positions.insert(qc.queue_position()));
    }

    let after = engine.sequence().await;
    eyre::ensure!(positions.len() == 16);
    eyre::ensure!(after.peek_position().value() == before.peek_position().value() + 16);
    eyre::ensure!(store.len() == 32);
    Ok(())
}
