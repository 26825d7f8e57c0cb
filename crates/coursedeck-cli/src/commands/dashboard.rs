//! Dashboard command handler

use anyhow::Result;

use coursedeck_core::views::Dashboard;

use crate::context::Context;
use crate::output::Output;

/// Show enrollment stats and per-course progress
pub async fn show(ctx: &Context, output: &Output) -> Result<()> {
    ctx.load_catalog().await?;
    let state = ctx.store.snapshot();
    output.print_dashboard(&Dashboard::new(&state))
}
