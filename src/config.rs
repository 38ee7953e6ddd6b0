// Settings loaded from an optional TOML file overlaid by SAWITQL_* environment variables

use crate::aql::TranslationMode;
use crate::core::AqlError;
use crate::network::ClientConfig;
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Searched in order when no explicit file is given; the first existing one wins.
pub const CONFIG_PATHS: [&str; 2] = ["/etc/sawitql/sawitql.toml", "./sawitql.toml"];

pub const ENV_PREFIX: &str = "SAWITQL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_true")]
    pub keepalive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub translation: TranslationMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 7878 }
fn default_dial_timeout_ms() -> u64 { 5_000 }
fn default_io_timeout_ms() -> u64 { 10_000 }
fn default_max_attempts() -> u32 { 3 }
fn default_retry_backoff_ms() -> u64 { 1_000 }
fn default_true() -> bool { true }
fn default_max_connections() -> u32 { 5 }
fn default_filter() -> String { "info".to_string() }

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dial_timeout_ms: default_dial_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            keepalive: default_true(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            translation: TranslationMode::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: default_filter() }
    }
}

impl RemoteSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub const fn client_config(&self) -> ClientConfig {
        ClientConfig {
            dial_timeout: Duration::from_millis(self.dial_timeout_ms),
            io_timeout: Duration::from_millis(self.io_timeout_ms),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            keepalive: self.keepalive,
        }
    }
}

/// `SAWITQL_REMOTE__PORT=7879` overrides `remote.port`.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Loads settings: explicit file (required) or the first existing default
    /// path, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AqlError> {
        let file = path.map(Path::to_path_buf).or_else(|| {
            CONFIG_PATHS
                .iter()
                .map(Path::new)
                .find(|p| p.exists())
                .map(Path::to_path_buf)
        });
        Self::from_sources(file.as_deref(), environment())
    }

    pub fn from_sources(file: Option<&Path>, env: Environment) -> Result<Self, AqlError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(File::from(path));
        }
        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }
}
