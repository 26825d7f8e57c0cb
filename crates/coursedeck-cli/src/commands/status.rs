//! Status command handler

use anyhow::Result;

use coursedeck_core::remote::ConnectionStatus;

use crate::context::Context;
use crate::output::{Output, OutputFormat};

fn connection_label(status: Option<ConnectionStatus>) -> &'static str {
    match status {
        None => "local",
        Some(ConnectionStatus::Connected) => "connected",
        Some(ConnectionStatus::Connecting) => "connecting",
        Some(ConnectionStatus::Disconnected) => "disconnected",
    }
}

/// Show status information
pub async fn show(ctx: &Context, output: &Output) -> Result<()> {
    // A failed load still leaves a useful report
    let load_error = ctx.load_catalog().await.err();
    let state = ctx.store.snapshot();
    let connection = connection_label(ctx.backend.connection());
    let session = ctx.session();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "source": ctx.backend.source.to_string(),
                    "connection": connection,
                    "session": session,
                    "counts": {
                        "courses": state.courses.len(),
                        "enrollments": state.user.enrolled_courses.len()
                    },
                    "error": load_error.as_ref().map(|e| format!("{:#}", e))
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", connection);
        }
        OutputFormat::Human => {
            println!("coursedeck Status");
            println!("=================");
            println!();
            println!("Store:");
            println!("  Source:     {}", ctx.backend.source);
            println!("  Connection: {}", connection);
            if let Some(ref e) = load_error {
                println!("  Error:      {:#}", e);
            }
            println!();
            println!("Session:");
            println!("  User:  {} ({})", session.name, session.user_id);
            if !session.email.is_empty() {
                println!("  Email: {}", session.email);
            }
            println!();
            println!("Contents:");
            println!("  Courses:     {}", state.courses.len());
            println!("  Enrollments: {}", state.user.enrolled_courses.len());
            println!();
            println!("Data dir: {}", ctx.config.data_dir.display());
        }
    }

    Ok(())
}
