//! Course command handlers

use anyhow::{anyhow, bail, Context as _, Result};

use coursedeck_core::views::catalog::search;
use coursedeck_core::views::EnrollButtonState;
use coursedeck_core::EnrollOutcome;

use crate::context::Context;
use crate::output::Output;

/// List all courses, optionally filtered by a search query
pub async fn list(ctx: &Context, query: Option<String>, output: &Output) -> Result<()> {
    ctx.load_catalog().await?;
    let state = ctx.store.snapshot();

    let courses = match query.as_deref() {
        Some(q) => search(&state.courses, q),
        None => state.courses.iter().collect(),
    };

    output.print_courses(&courses, query.as_deref(), &state.user)
}

/// Show a single course
pub async fn show(ctx: &Context, id: &str, output: &Output) -> Result<()> {
    let course = ctx
        .adapter
        .get_course(id)
        .await
        .context("Failed to load course")?
        .ok_or_else(|| anyhow!("Course not found: {}", id))?;

    let state = ctx.store.snapshot();
    let button =
        EnrollButtonState::for_course(&course, &state.user, ctx.actions.is_enrolling(id));
    output.print_course(&course, button, &ctx.session().user_id)
}

/// Enroll the session user in a course
pub async fn enroll(ctx: &Context, id: &str, output: &Output) -> Result<()> {
    ctx.load_catalog().await?;
    let name = ctx
        .store
        .snapshot()
        .course(id)
        .map(|c| c.name.clone())
        .ok_or_else(|| anyhow!("Course not found: {}", id))?;

    match ctx.actions.enroll(id).await {
        EnrollOutcome::Enrolled => {
            output.success(&format!("Enrolled in {}", name));
        }
        EnrollOutcome::AlreadyEnrolled => {
            output.message(&format!("Already enrolled in {}", name));
        }
        EnrollOutcome::InFlight => {
            output.message(&format!("Enrollment in {} is already in progress", name));
        }
        EnrollOutcome::Closed => bail!("Enrollment is closed for {}", name),
        EnrollOutcome::Failed(e) => {
            return Err(anyhow!(e).context(format!("Failed to enroll in {}", name)));
        }
    }
    Ok(())
}

/// Like or unlike a course
pub async fn like(ctx: &Context, id: &str, output: &Output) -> Result<()> {
    let liked = ctx
        .actions
        .toggle_like(id)
        .await
        .context("Failed to update like")?
        .ok_or_else(|| anyhow!("Course not found: {}", id))?;

    output.success(&format!(
        "{} course {}",
        if liked { "Liked" } else { "Unliked" },
        id
    ));
    Ok(())
}

/// List the students enrolled in a course
pub async fn students(ctx: &Context, id: &str, output: &Output) -> Result<()> {
    let students = ctx
        .adapter
        .enrolled_students(id)
        .await
        .context("Failed to load students")?;
    output.print_students(&students)
}
