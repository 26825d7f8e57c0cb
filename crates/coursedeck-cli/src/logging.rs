//! Logging setup
//!
//! Logging is off unless COURSEDECK_LOG holds a level (`debug`, `info`, ...).
//! Commands log to stderr; the TUI owns the terminal, so it logs to a file.

use std::fs::File;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use coursedeck_core::Config;

const LOG_ENV: &str = "COURSEDECK_LOG";

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "coursedeck_core={},coursedeck_cli={}",
        level, level
    ))
}

/// Log to stderr for one-shot commands
pub fn init_cli_logging() {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(&log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log to the configured file while the TUI is running
pub fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(&log_level))
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
