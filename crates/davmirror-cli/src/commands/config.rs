//! Config command - View and manage davmirror configuration
//!
//! Provides the `davmirror config` CLI command which:
//! 1. Shows the current configuration with the password redacted
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use anyhow::{Context as _, Result};
use clap::Subcommand;
use tracing::info;

use davmirror_core::config::Config;

use super::{CliError, Context};
use crate::output::{get_formatter, plural, OutputFormat};

const REDACTED: &str = "********";

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("server.url", "WebDAV base URL (http or https)"),
    ("server.username", "Account name"),
    ("server.password", "Password; empty or 'none' removes it"),
    ("logging.level", "trace|debug|info|warn|error"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "server.url")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value),
            ConfigCommand::Validate => execute_validate(ctx),
        }
    }
}

fn execute_show(ctx: &Context) -> Result<()> {
    let formatter = get_formatter(ctx.format, ctx.quiet);
    let config = redacted(Config::load_or_default(&ctx.config_path));

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        }
        OutputFormat::Human => {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");
            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
    }
    Ok(())
}

fn execute_set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let formatter = get_formatter(ctx.format, ctx.quiet);
    let mut config = Config::load_or_default(&ctx.config_path);

    let shown = if key == "server.password" { REDACTED } else { value };
    info!(key = %key, value = %shown, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if ctx.format == OutputFormat::Human {
            formatter.info("Supported keys:");
            for (name, help) in SUPPORTED_KEYS {
                formatter.info(&format!("  {name:<18} - {help}"));
            }
        }
        return Err(CliError::Config(format!("Failed to set '{key}': {e}")).into());
    }

    // Only the edited field must be valid; the rest may still be incomplete
    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|e| e.field == key)
        .map(|e| e.message)
        .collect();
    if !errors.is_empty() {
        return Err(CliError::Config(format!(
            "Invalid value for '{key}': {}",
            errors.join("; ")
        ))
        .into());
    }

    if let Some(parent) = ctx.config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
    std::fs::write(&ctx.config_path, yaml).context("Failed to write configuration file")?;

    match ctx.format {
        OutputFormat::Json => formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": shown,
            "config_path": ctx.config_path.display().to_string(),
        })),
        OutputFormat::Human => {
            formatter.success(&format!("Set {key} = {shown}"));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
    }
    Ok(())
}

fn execute_validate(ctx: &Context) -> Result<()> {
    let formatter = get_formatter(ctx.format, ctx.quiet);
    let path = &ctx.config_path;

    if !path.exists() {
        return Err(CliError::Config(format!(
            "Configuration file not found at {}",
            path.display()
        ))
        .into());
    }
    let config = Config::load(path)
        .map_err(|e| CliError::Config(format!("Failed to parse configuration: {e:#}")))?;

    info!(config_path = %path.display(), "Validating configuration");
    let errors = config.validate();

    match ctx.format {
        OutputFormat::Json => {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": path.display().to_string(),
                "errors": messages,
            }));
        }
        OutputFormat::Human if errors.is_empty() => {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", path.display()));
        }
        OutputFormat::Human => {
            formatter.info(&format!("File: {}", path.display()));
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
    }

    if !errors.is_empty() {
        return Err(CliError::Config(format!(
            "Configuration has {}",
            plural(errors.len() as u64, "error")
        ))
        .into());
    }
    Ok(())
}

fn redacted(mut config: Config) -> Config {
    if config.server.password.is_some() {
        config.server.password = Some(REDACTED.to_string());
    }
    config
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server.url" => config.server.url = value.to_string(),
        "server.username" => config.server.username = value.to_string(),
        "server.password" => {
            config.server.password = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "logging.level" => config.logging.level = value.to_string(),
        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }
    Ok(())
}
