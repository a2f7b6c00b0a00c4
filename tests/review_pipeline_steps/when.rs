//! When steps for review pipeline BDD scenarios.

use super::world::{ReviewPipelineWorld, run_async};
use mockable::DefaultClock;
use reelflow::workflow::domain::{AttachedFile, FileUpload, ReviewerId};
use rstest_bdd_macros::when;

#[when(r#"the editor submits the task with file "{name}""#)]
fn editor_submits(world: &mut ReviewPipelineWorld, name: String) -> Result<(), eyre::Report> {
    let task = world.latest_task()?.clone();
    let file = AttachedFile::new(
        FileUpload {
            url: format!("store://media/{name}"),
            name,
            uploaded_by: ReviewerId::new(task.assigned_to().as_str())?,
            size: 2_048,
            mime_type: "video/quicktime".to_owned(),
        },
        &DefaultClock,
    )?;
    let result = run_async(world.engine()?.submit_for_review(task.id(), vec![file]));
    world.record(result);
    Ok(())
}

#[when(r#"QC rejects the review with reason "{reason}""#)]
fn qc_rejects(world: &mut ReviewPipelineWorld, reason: String) -> Result<(), eyre::Report> {
    let task_id = world.latest_task()?.id();
    let result = run_async(world.engine()?.reject(task_id, reason));
    world.record(result);
    Ok(())
}

#[when("QC rejects the review without a reason")]
fn qc_rejects_without_reason(world: &mut ReviewPipelineWorld) -> Result<(), eyre::Report> {
    let task_id = world.latest_task()?.id();
    let result = run_async(world.engine()?.reject(task_id, ""));
    world.record(result);
    Ok(())
}

#[when(r#"QC approves the review with feedback "{feedback}""#)]
fn qc_approves(world: &mut ReviewPipelineWorld, feedback: String) -> Result<(), eyre::Report> {
    let task_id = world.latest_task()?.id();
    let result = run_async(world.engine()?.approve(task_id, Some(feedback)));
    world.record(result);
    Ok(())
}

#[when("the scheduler confirms the slot")]
fn scheduler_confirms(world: &mut ReviewPipelineWorld) -> Result<(), eyre::Report> {
    let task_id = world.latest_task()?.id();
    let engine = world.engine()?;
    let result = run_async(async {
        match engine.confirm_scheduled(task_id).await {
            Ok(()) => engine.get_task(task_id).await,
            Err(err) => Err(err),
        }
    });
    world.record(result);
    Ok(())
}
