//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use coursedeck_core::Config;

use crate::output::{Output, OutputFormat};

fn or_not_set(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "store_url": config.store_url,
                    "catalog_file": config.catalog_file,
                    "log_file": config.log_file,
                    "session": config.session,
                    "enrollments": config.enrollments.len(),
                    "request_timeout_secs": config.request_timeout_secs
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            let catalog = config.catalog_file.as_ref().map(|p| p.display().to_string());
            let log_file = config.log_file.as_ref().map(|p| p.display().to_string());

            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  store_url:            {}", or_not_set(config.store_url.as_deref()));
            println!("  catalog_file:         {}", or_not_set(catalog.as_deref()));
            println!("  log_file:             {}", or_not_set(log_file.as_deref()));
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!();
            println!("Session:");
            println!("  user_id:    {}", or_not_set(config.session.id.as_deref()));
            println!("  user_name:  {}", or_not_set(config.session.name.as_deref()));
            println!("  user_email: {}", or_not_set(config.session.email.as_deref()));
            println!("  enrollments: {}", config.enrollments.len());
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// `None` for an empty value or "none"
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => config.data_dir = value.into(),
        "store_url" => config.store_url = optional(value),
        "catalog_file" => config.catalog_file = optional(value).map(PathBuf::from),
        "log_file" => config.log_file = optional(value).map(PathBuf::from),
        "user_id" => config.session.id = optional(value),
        "user_name" => config.session.name = optional(value),
        "user_email" => config.session.email = optional(value),
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, store_url, catalog_file, log_file, \
                 user_id, user_name, user_email, request_timeout_secs",
                key
            );
        }
    }
    Ok(())
}
