//! Configuration module for davmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Mapping files (which folder pairs to sync) are loaded separately by
//! [`MappingFile`] so one server configuration can drive several jobs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{DomainError, Direction, SyncMapping};

/// Environment variable that overrides `server.password`.
pub const PASSWORD_ENV: &str = "DAVMIRROR_PASSWORD";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for davmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// WebDAV endpoint and credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the user's WebDAV root, e.g.
    /// `https://cloud.example.com/remote.php/dav/files/alice/`.
    pub url: String,
    pub username: String,
    /// May be omitted when `DAVMIRROR_PASSWORD` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ServerConfig {
    /// The password to use: the environment wins over the file.
    pub fn effective_password(&self) -> Option<String> {
        std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.password.clone())
    }
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/davmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("davmirror")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"server.url"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Markers left in the shipped template that must be replaced by the user.
const PLACEHOLDER_MARKERS: &[&str] = &["your-", "YOUR_"];

fn check_filled(field: &str, value: Option<&str>, errors: &mut Vec<ValidationError>) {
    match value.map(str::trim) {
        None | Some("") => errors.push(ValidationError {
            field: field.into(),
            message: "is required".into(),
        }),
        Some(v) if PLACEHOLDER_MARKERS.iter().any(|m| v.contains(m)) => {
            errors.push(ValidationError {
                field: field.into(),
                message: "still contains a template placeholder".into(),
            })
        }
        Some(_) => {}
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- server ---
        check_filled("server.url", Some(&self.server.url), &mut errors);
        if !self.server.url.trim().is_empty() {
            match url::Url::parse(self.server.url.trim()) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                Ok(u) => errors.push(ValidationError {
                    field: "server.url".into(),
                    message: format!("unsupported scheme '{}'; use http or https", u.scheme()),
                }),
                Err(e) => errors.push(ValidationError {
                    field: "server.url".into(),
                    message: format!("not a valid URL: {e}"),
                }),
            }
        }
        check_filled("server.username", Some(&self.server.username), &mut errors);
        check_filled(
            "server.password",
            self.server.effective_password().as_deref(),
            &mut errors,
        );

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use davmirror_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .server_url("https://cloud.example.com/remote.php/dav/files/alice/")
///     .server_username("alice")
///     .server_password("secret")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.url = url.into();
        self
    }

    pub fn server_username(mut self, username: impl Into<String>) -> Self {
        self.config.server.username = username.into();
        self
    }

    pub fn server_password(mut self, password: impl Into<String>) -> Self {
        self.config.server.password = Some(password.into());
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Mapping files
// ---------------------------------------------------------------------------

/// One `{localFolder, remoteFolder, ignore}` record of a mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    #[serde(default)]
    pub local_folder: String,
    #[serde(default)]
    pub remote_folder: String,
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// The list of folder pairs one CLI invocation processes.
///
/// Two on-disk formats are accepted:
///
/// ```yaml
/// sync:
///   - localFolder: /home/alice/Documents
///     remoteFolder: /Documents
///     ignore: ["*.tmp", ".git"]
/// ```
///
/// or, for any extension other than `.yaml`/`.yml`, one `local=remote` pair
/// per line with `#` and `//` comment lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default)]
    pub sync: Vec<MappingEntry>,
}

impl MappingFile {
    /// Load a mapping file, picking the format from the extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Ok(Self::parse_lines(&content))
        }
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        // An empty document deserializes to `null`
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse the line-based `local=remote` format.
    ///
    /// Malformed lines are skipped with a warning rather than failing the file.
    pub fn parse_lines(content: &str) -> Self {
        let mut sync = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            let Some(eq) = line.find('=').filter(|&i| i > 0) else {
                warn!(line = index + 1, content = line, "Skipping mapping line without '='");
                continue;
            };

            let local_folder = line[..eq].trim();
            let remote_folder = line[eq + 1..].trim();
            if local_folder.is_empty() || remote_folder.is_empty() {
                warn!(line = index + 1, content = line, "Skipping mapping line with empty side");
                continue;
            }

            sync.push(MappingEntry {
                local_folder: local_folder.to_string(),
                remote_folder: remote_folder.to_string(),
                ignore: Vec::new(),
            });
        }

        Self { sync }
    }

    /// Validate every entry and turn it into a [`SyncMapping`].
    ///
    /// Fails on the first invalid entry so nothing runs against a
    /// half-valid file.
    pub fn into_mappings(self, direction: Direction) -> Result<Vec<SyncMapping>, DomainError> {
        self.sync
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                SyncMapping::new(
                    &entry.local_folder,
                    &entry.remote_folder,
                    &entry.ignore,
                    direction,
                )
                .map_err(|e| DomainError::InvalidMapping(format!("entry {}: {e}", index + 1)))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
