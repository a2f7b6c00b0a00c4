//! Given steps for review pipeline BDD scenarios.

use super::world::{ReviewPipelineWorld, new_engine, run_async};
use eyre::WrapErr;
use reelflow::workflow::{
    config::{RetryPolicy, WorkflowConfig},
    domain::{ReviewerId, ReviewerRoster, Role},
    services::CreateRootTaskRequest,
};
use rstest_bdd_macros::given;

#[given(r#"a studio with QC reviewers "{first}" and "{second}""#)]
fn studio_with_qc_reviewers(
    world: &mut ReviewPipelineWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let roster = ReviewerRoster::new()
        .with_role(Role::Editor, [ReviewerId::new("erin")?])
        .with_role(Role::Qc, [ReviewerId::new(first)?, ReviewerId::new(second)?])
        .with_role(Role::Scheduler, [ReviewerId::new("sasha")?]);
    let engine = new_engine(WorkflowConfig::new(roster).with_retry(RetryPolicy::immediate(2)));
    world.notifications = Some(engine.subscribe());
    world.engine = Some(engine);
    Ok(())
}

#[given(r#"a root task "{title}" assigned to editor "{editor}""#)]
fn root_task_assigned_to_editor(
    world: &mut ReviewPipelineWorld,
    title: String,
    editor: String,
) -> Result<(), eyre::Report> {
    let request = CreateRootTaskRequest::new(title).with_editor(ReviewerId::new(editor)?);
    let created = run_async(world.engine()?.create_root_task(request))
        .wrap_err("create root task for pipeline scenario")?;
    world.root_task = Some(created.clone());
    world.latest_task = Some(created);
    Ok(())
}
