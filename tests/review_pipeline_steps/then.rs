//! Then steps for review pipeline BDD scenarios.

use super::world::ReviewPipelineWorld;
use reelflow::workflow::{
    domain::{Stage, WorkflowDomainError},
    services::{WorkflowEngineError, WorkflowNotification},
};
use rstest_bdd_macros::then;

#[then(r#"the latest task is in stage "{stage}""#)]
fn latest_task_in_stage(world: &ReviewPipelineWorld, stage: String) -> Result<(), eyre::Report> {
    let expected = Stage::try_from(stage.as_str())
        .map_err(|err| eyre::eyre!("invalid expected stage in scenario: {err}"))?;
    let task = world.latest_task()?;
    if task.stage() != expected {
        return Err(eyre::eyre!(
            "expected stage {}, found {}",
            expected,
            task.stage()
        ));
    }
    Ok(())
}

#[then(r#"the latest task is assigned to "{reviewer}""#)]
fn latest_task_assigned_to(
    world: &ReviewPipelineWorld,
    reviewer: String,
) -> Result<(), eyre::Report> {
    let task = world.latest_task()?;
    if task.assigned_to().as_str() != reviewer {
        return Err(eyre::eyre!(
            "expected assignee {reviewer}, found {}",
            task.assigned_to()
        ));
    }
    Ok(())
}

#[then(r#"the latest task carries the rejection reason "{reason}""#)]
fn latest_task_carries_reason(
    world: &ReviewPipelineWorld,
    reason: String,
) -> Result<(), eyre::Report> {
    let task = world.latest_task()?;
    if task.rejection_reason() != Some(reason.as_str()) {
        return Err(eyre::eyre!(
            "expected rejection reason {reason:?}, found {:?}",
            task.rejection_reason()
        ));
    }
    Ok(())
}

#[then("the workflow completes for the root task")]
fn workflow_completes(world: &mut ReviewPipelineWorld) -> Result<(), eyre::Report> {
    let root_id = world
        .root_task
        .as_ref()
        .map(reelflow::workflow::domain::Task::id)
        .ok_or_else(|| eyre::eyre!("missing root task in scenario world"))?;
    let notifications = world
        .notifications
        .as_mut()
        .ok_or_else(|| eyre::eyre!("missing notification subscription"))?;

    while let Ok(notification) = notifications.try_recv() {
        if let WorkflowNotification::WorkflowCompleted { origin_task_id, .. } = notification {
            if origin_task_id == root_id {
                return Ok(());
            }
        }
    }
    Err(eyre::eyre!("no completion notification for root task {root_id}"))
}

#[then("the decision fails with a missing feedback error")]
fn decision_fails_with_missing_feedback(world: &ReviewPipelineWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;

    if !matches!(
        result,
        Err(WorkflowEngineError::Domain(WorkflowDomainError::MissingFeedback))
    ) {
        return Err(eyre::eyre!("expected MissingFeedback error, got {result:?}"));
    }
    Ok(())
}
