//! davmirror CLI - one-way WebDAV folder mirroring
//!
//! Provides commands for:
//! - Mirroring remote folders to local disk (`download`)
//! - Mirroring local folders to the server (`upload`)
//! - Listing a remote folder
//! - Viewing and validating configuration

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, list::ListCommand,
    sync::SyncCommand, CliError, Context,
};
use davmirror_core::config::Config;
use davmirror_core::domain::Direction;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "davmirror",
    version,
    about = "One-way folder mirroring over WebDAV"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Make local folders mirror their remote counterparts
    Download(SyncCommand),
    /// Make remote folders mirror their local counterparts
    Upload(SyncCommand),
    /// List a remote folder
    List(ListCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Picks the log filter: `RUST_LOG`, then `-v`/`-q`, then the config file
fn log_filter(verbose: u8, quiet: bool, configured: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = match (verbose, quiet) {
        (0, true) => "error",
        (0, false) => configured,
        (1, _) => "debug",
        _ => "trace",
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let configured_level = Config::load_or_default(&config_path).logging.level;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, cli.quiet, &configured_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = Context {
        config_path,
        format,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Download(cmd) => cmd.execute(Direction::Download, &ctx).await,
        Commands::Upload(cmd) => cmd.execute(Direction::Upload, &ctx).await,
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<CliError>()
                .map_or(commands::EXIT_FAILURE, CliError::exit_code);
            // Mapping failures were already reported per mapping
            if !matches!(e.downcast_ref::<CliError>(), Some(CliError::MappingsFailed { .. })) {
                get_formatter(ctx.format, ctx.quiet).error(&format!("{e:#}"));
            }
            ExitCode::from(code)
        }
    }
}
