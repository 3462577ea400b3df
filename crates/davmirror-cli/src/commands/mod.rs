//! Subcommand implementations
//!
//! Each command is a clap `Args`/`Subcommand` type with an
//! `execute(&self, ..)` method returning `anyhow::Result<()>`. Errors that
//! map to a specific exit code are raised as [`CliError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::output::OutputFormat;

pub mod completions;
pub mod config;
pub mod list;
pub mod sync;

/// Unexpected failure
pub const EXIT_FAILURE: u8 = 1;
/// Configuration, mapping file, or argument error
pub const EXIT_CONFIG: u8 = 2;
/// At least one mapping failed as a whole
pub const EXIT_MAPPING_FAILED: u8 = 3;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Errors with a dedicated exit code
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration or a mapping file is missing or invalid
    #[error("{0}")]
    Config(String),

    /// Some mappings could not be synchronized at all
    #[error("{failed} of {total} mappings failed")]
    MappingsFailed { failed: usize, total: usize },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => EXIT_CONFIG,
            CliError::MappingsFailed { .. } => EXIT_MAPPING_FAILED,
        }
    }
}

/// Loads the config file and checks it is complete enough to reach a server
pub(crate) fn load_server_config(ctx: &Context) -> Result<davmirror_core::config::Config, CliError> {
    use davmirror_core::config::Config;

    if !ctx.config_path.exists() {
        return Err(CliError::Config(format!(
            "Configuration file not found at {}",
            ctx.config_path.display()
        )));
    }
    let config = Config::load(&ctx.config_path).map_err(|e| CliError::Config(format!("{e:#}")))?;

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(CliError::Config(format!(
            "Invalid configuration {}: {}",
            ctx.config_path.display(),
            messages.join("; ")
        )));
    }
    Ok(config)
}
