//! List command - show the contents of a remote folder
//!
//! Usage: `davmirror list /Documents`

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::Args;
use tracing::info;

use davmirror_core::domain::RemotePath;
use davmirror_core::ports::{ITransport, RemoteEntry};
use davmirror_webdav::{WebDavClient, WebDavTransport};

use super::{load_server_config, CliError, Context};
use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Remote folder, relative to the server root
    #[arg(default_value = "/")]
    pub path: String,
}

impl ListCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format, ctx.quiet);
        let path = RemotePath::new(self.path.clone())
            .map_err(|e| CliError::Config(format!("Invalid remote path: {e}")))?;

        let config = load_server_config(ctx)?;
        let client =
            WebDavClient::from_config(&config.server).map_err(|e| CliError::Config(e.to_string()))?;
        let transport = WebDavTransport::new(client);

        info!(path = %path, "Listing remote folder");
        let mut entries = transport.list(&path).await?;
        sort_entries(&mut entries);

        match ctx.format {
            OutputFormat::Json => formatter.print_json(&serde_json::json!({
                "path": path.as_str(),
                "entries": entries,
            })),
            OutputFormat::Human => {
                formatter.success(&format!("{path} ({})", plural(entries.len() as u64, "entry")));
                for entry in &entries {
                    formatter.info(&entry_line(entry));
                }
            }
        }
        Ok(())
    }
}

/// Directories first, then by name
fn sort_entries(entries: &mut [RemoteEntry]) {
    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn entry_line(entry: &RemoteEntry) -> String {
    let size = if entry.is_directory {
        "-".to_string()
    } else {
        format_size(entry.size)
    };
    let name = if entry.is_directory {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    };
    format!("{size:>9}  {}  {name}", format_modified(entry.modified))
}

fn format_modified(modified: Option<DateTime<Utc>>) -> String {
    match modified {
        Some(t) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => format!("{:<16}", "-"),
    }
}

/// `512 B`, `1.5 KiB`, `3.0 MiB`
fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
