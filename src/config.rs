use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::duration::ConfigDuration;

// =============================================================================
// Defaults
// =============================================================================

/// Default config file, resolved against the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default interval between poll cycles (1 hour)
pub const DEFAULT_CHECK_INTERVAL: ConfigDuration = ConfigDuration::from_secs(60 * 60);

/// Default timeout for index fetches and webhook deliveries (30 seconds)
pub const DEFAULT_TIMEOUT: ConfigDuration = ConfigDuration::from_secs(30);

/// Delay between starting each repository fetch within a cycle (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Index file appended to repository URLs that do not point at one
pub const INDEX_PATH: &str = "/index.yaml";

const INDEX_EXTENSION: &str = ".yaml";

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_REPOSITORIES: &str = "CVM_REPOSITORIES";
pub const ENV_WEBHOOK_URL: &str = "CVM_WEBHOOK_URL";
pub const ENV_REPORT_START: &str = "CVM_REPORT_START";
pub const ENV_CHECK_INTERVAL: &str = "CVM_CHECK_INTERVAL";
pub const ENV_FETCH_TIMEOUT: &str = "CVM_FETCH_TIMEOUT";
pub const ENV_NOTIFY_TIMEOUT: &str = "CVM_NOTIFY_TIMEOUT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no repositories configured")]
    NoRepositories,

    #[error("repositories contains an invalid repository: {0}")]
    InvalidRepository(String),

    #[error("no webhookURL configured")]
    NoWebhookUrl,

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// A chart to watch and the charts that should be rechecked when it changes
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Chart {
    pub name: String,
    #[serde(default)]
    pub dependees: Vec<String>,
}

/// A chart repository and the charts watched in it
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Repository {
    pub url: String,
    #[serde(default)]
    pub charts: Vec<Chart>,
}

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub repositories: Vec<Repository>,
    pub check_interval: ConfigDuration,
    #[serde(rename = "webhookURL")]
    pub webhook_url: String,
    pub report_start: bool,
    pub fetch_timeout: ConfigDuration,
    pub notify_timeout: ConfigDuration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            webhook_url: String::new(),
            report_start: true,
            fetch_timeout: DEFAULT_TIMEOUT,
            notify_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Load, override, validate and normalize the configuration.
    ///
    /// Order: file (or defaults when absent) -> `CVM_*` environment
    /// variables -> validation -> repository URL normalization.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        config.normalize_repository_urls();
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it does not exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                info!("Successfully opened {}", path.display());
                Self::parse(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Override fields from `CVM_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        override_repositories(&mut self.repositories, ENV_REPOSITORIES);
        override_string(&mut self.webhook_url, ENV_WEBHOOK_URL);
        override_bool(&mut self.report_start, ENV_REPORT_START);
        override_duration(&mut self.check_interval, ENV_CHECK_INTERVAL);
        override_duration(&mut self.fetch_timeout, ENV_FETCH_TIMEOUT);
        override_duration(&mut self.notify_timeout, ENV_NOTIFY_TIMEOUT);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repositories.is_empty() {
            return Err(ConfigError::NoRepositories);
        }

        if self.repositories.iter().any(|r| r.url.trim().is_empty()) {
            return Err(ConfigError::InvalidRepository(
                "the repository URL should not be empty".to_string(),
            ));
        }

        if self.webhook_url.trim().is_empty() {
            return Err(ConfigError::NoWebhookUrl);
        }

        for (field, value) in [
            ("checkInterval", self.check_interval),
            ("fetchTimeout", self.fetch_timeout),
            ("notifyTimeout", self.notify_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Point every repository URL at its index document
    pub fn normalize_repository_urls(&mut self) {
        for repository in &mut self.repositories {
            repository.url = index_url(&repository.url);
        }
    }

    /// Charts watched in the given repository, empty when it is unknown
    pub fn charts_for_repository(&self, repository: &str) -> &[Chart] {
        self.repositories
            .iter()
            .find(|r| r.url == repository)
            .map(|r| r.charts.as_slice())
            .unwrap_or_default()
    }

    /// Dependees configured for a chart, empty when either is unknown
    pub fn dependees_for_chart(&self, repository: &str, chart: &str) -> &[String] {
        self.charts_for_repository(repository)
            .iter()
            .find(|c| c.name == chart)
            .map(|c| c.dependees.as_slice())
            .unwrap_or_default()
    }

    /// Human-readable configuration block sent with the startup notification
    pub fn summary(&self) -> String {
        let repositories = serde_json::to_string_pretty(&self.repositories)
            .unwrap_or_else(|_| "[]".to_string());
        format!(
            "Configuration:\nWebhook: {}\nCheck interval: {}\nReport start: {}\nRepositories:\n```\n{}\n```\n",
            self.webhook_url, self.check_interval, self.report_start, repositories
        )
    }
}

/// Append the index path to a repository URL unless it already names a YAML file.
///
/// Examples:
/// - "https://charts.example.com" -> "https://charts.example.com/index.yaml"
/// - "https://charts.example.com/" -> "https://charts.example.com/index.yaml"
/// - "https://charts.example.com/stable.yaml" -> unchanged
pub fn index_url(url: &str) -> String {
    if url.ends_with(INDEX_EXTENSION) {
        return url.to_string();
    }
    format!("{}{}", url.trim_end_matches('/'), INDEX_PATH)
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

/// Accepts the same spellings as Go's `strconv.ParseBool`
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match parse_bool(&val) {
            Some(parsed) => *target = parsed,
            None => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_duration(target: &mut ConfigDuration, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<ConfigDuration>() {
            Ok(parsed) => *target = parsed,
            Err(e) => warn!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse duration from env var, ignoring"
            ),
        }
    }
}

fn override_repositories(target: &mut Vec<Repository>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match serde_json::from_str::<Vec<Repository>>(&val) {
            Ok(parsed) => *target = parsed,
            Err(e) => warn!(
                env_key,
                error = %e,
                "failed to parse repositories from env var, ignoring"
            ),
        }
    }
}
