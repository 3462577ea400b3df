//! Download and upload commands
//!
//! `davmirror download <mappings>` and `davmirror upload <mappings>`:
//! 1. Load and validate the server configuration
//! 2. Load the mapping file and validate every mapping up front
//! 3. Run the engine over each mapping in order
//! 4. Report per-mapping results; a failed mapping does not stop the others

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use davmirror_core::config::MappingFile;
use davmirror_core::domain::Direction;
use davmirror_core::ports::ITransport;
use davmirror_sync::filesystem::LocalFileSystemAdapter;
use davmirror_sync::{MappingOutcome, SyncEngine, SyncReport};
use davmirror_webdav::{WebDavClient, WebDavTransport};

use super::{load_server_config, CliError, Context};
use crate::output::{format_duration, get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Mapping file (`.yaml`/`.yml`, or one `local=remote` pair per line)
    pub mappings: PathBuf,
}

impl SyncCommand {
    pub async fn execute(&self, direction: Direction, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format, ctx.quiet);

        let config = load_server_config(ctx)?;
        let mappings = MappingFile::load(&self.mappings)
            .map_err(|e| {
                CliError::Config(format!(
                    "Cannot read mapping file {}: {e:#}",
                    self.mappings.display()
                ))
            })?
            .into_mappings(direction)
            .map_err(|e| {
                CliError::Config(format!(
                    "Invalid mapping file {}: {e}",
                    self.mappings.display()
                ))
            })?;

        if mappings.is_empty() {
            formatter.warn(&format!("No mappings in {}", self.mappings.display()));
            formatter.print_json(&serde_json::json!({ "direction": direction, "mappings": [] }));
            return Ok(());
        }

        let client =
            WebDavClient::from_config(&config.server).map_err(|e| CliError::Config(e.to_string()))?;
        let transport = Arc::new(WebDavTransport::new(client));
        let engine = SyncEngine::new(transport.clone(), Arc::new(LocalFileSystemAdapter::new()));

        info!(%direction, count = mappings.len(), file = %self.mappings.display(), "Running mappings");
        let total = mappings.len();
        let outcomes = engine.run_all(mappings).await;
        if let Err(e) = transport.close().await {
            tracing::debug!(error = %e, "Transport close failed");
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        match ctx.format {
            OutputFormat::Json => {
                let results: Vec<serde_json::Value> = outcomes.iter().map(outcome_json).collect();
                formatter.print_json(&serde_json::json!({
                    "direction": direction,
                    "mappings": results,
                    "failed": failed,
                }));
            }
            OutputFormat::Human => {
                for outcome in &outcomes {
                    print_outcome(formatter.as_ref(), direction, outcome);
                }
            }
        }

        if failed > 0 {
            return Err(CliError::MappingsFailed { failed, total }.into());
        }
        Ok(())
    }
}

fn outcome_json(outcome: &MappingOutcome) -> serde_json::Value {
    let mapping = serde_json::json!({
        "local": outcome.mapping.local_root.display().to_string(),
        "remote": outcome.mapping.remote_root.as_str(),
    });
    match &outcome.result {
        Ok(report) => serde_json::json!({
            "mapping": mapping,
            "success": true,
            "report": report,
        }),
        Err(e) => serde_json::json!({
            "mapping": mapping,
            "success": false,
            "error": e.to_string(),
        }),
    }
}

fn summary(direction: Direction, report: &SyncReport) -> String {
    let mut parts = Vec::new();
    match direction {
        Direction::Download => {
            parts.push(format!("{} downloaded", plural(report.files_downloaded, "file")))
        }
        Direction::Upload => {
            parts.push(format!("{} uploaded", plural(report.files_uploaded, "file")))
        }
    }
    if report.entries_deleted > 0 {
        parts.push(format!("{} deleted", plural(report.entries_deleted, "entry")));
    }
    if report.directories_created > 0 {
        parts.push(format!("{} created", plural(report.directories_created, "directory")));
    }
    parts.push(format!("{} unchanged", report.files_unchanged));
    parts.join(", ")
}

fn print_outcome(formatter: &dyn OutputFormatter, direction: Direction, outcome: &MappingOutcome) {
    match &outcome.result {
        Ok(report) if report.errors.is_empty() => {
            formatter.success(&format!(
                "{} ({})",
                outcome.mapping,
                format_duration(report.duration_ms)
            ));
            formatter.info(&summary(direction, report));
        }
        Ok(report) => {
            formatter.warn(&format!(
                "{} finished with {}",
                outcome.mapping,
                plural(report.errors.len() as u64, "error")
            ));
            formatter.info(&summary(direction, report));
            for failure in &report.errors {
                formatter.info(&format!("  - {failure}"));
            }
        }
        Err(e) => formatter.error(&format!("{}: {e}", outcome.mapping)),
    }
}
