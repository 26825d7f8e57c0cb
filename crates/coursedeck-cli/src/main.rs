//! coursedeck CLI
//!
//! Command-line interface and terminal UI for coursedeck - course catalog,
//! enrollment and progress tracking.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use coursedeck_core::Config;

mod commands;
mod context;
mod logging;
mod output;
mod tui;

use context::Context;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "coursedeck")]
#[command(about = "coursedeck - Browse courses, enroll and track your progress")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface
    Tui,
    /// List courses
    #[command(alias = "ls")]
    List {
        /// Only courses whose name or instructor contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show course details
    Show {
        /// Course ID
        id: String,
    },
    /// Enroll in a course
    Enroll {
        /// Course ID
        id: String,
    },
    /// Like or unlike a course
    Like {
        /// Course ID
        id: String,
    },
    /// List students enrolled in a course
    Students {
        /// Course ID
        id: String,
    },
    /// Show enrollment stats and progress
    Dashboard,
    /// Show status (store, connection, session)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (store_url, catalog_file, data_dir, log_file,
        /// user_id, user_name, user_email, request_timeout_secs)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Commands that don't need the store
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    // Handle TUI (default when no command given)
    let Some(command) = cli.command else {
        return tui::run(config).await;
    };
    if matches!(command, Commands::Tui) {
        return tui::run(config).await;
    }

    logging::init_cli_logging();
    let ctx = Context::open(config)?;

    match command {
        Commands::List { search } => commands::course::list(&ctx, search, &output).await,
        Commands::Show { id } => commands::course::show(&ctx, &id, &output).await,
        Commands::Enroll { id } => commands::course::enroll(&ctx, &id, &output).await,
        Commands::Like { id } => commands::course::like(&ctx, &id, &output).await,
        Commands::Students { id } => commands::course::students(&ctx, &id, &output).await,
        Commands::Dashboard => commands::dashboard::show(&ctx, &output).await,
        Commands::Status => commands::status::show(&ctx, &output).await,
        Commands::Tui | Commands::Config { .. } => Ok(()),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
