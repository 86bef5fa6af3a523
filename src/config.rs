//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::DatasourceSettings;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datasource: DatasourceConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection and editor defaults for the datasource instance
#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceConfig {
    #[serde(default = "default_uid")]
    pub uid: String,

    #[serde(default)]
    pub region: String,

    #[serde(default = "default_region")]
    pub default_region: String,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub profile: String,

    #[serde(default)]
    pub default_database: String,

    #[serde(default)]
    pub default_table: String,

    #[serde(default)]
    pub default_measure: String,
}

fn default_uid() -> String {
    "timestream".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            uid: default_uid(),
            region: String::new(),
            default_region: default_region(),
            endpoint: String::new(),
            profile: String::new(),
            default_database: String::new(),
            default_table: String::new(),
            default_measure: String::new(),
        }
    }
}

impl DatasourceConfig {
    /// Settings as the datasource instance sees them
    pub fn settings(&self) -> DatasourceSettings {
        let mut settings = DatasourceSettings {
            region: self.region.clone(),
            default_region: self.default_region.clone(),
            endpoint: self.endpoint.clone(),
            profile: self.profile.clone(),
            default_database: self.default_database.clone(),
            default_table: self.default_table.clone(),
            default_measure: self.default_measure.clone(),
        };
        settings.resolve_region();
        settings
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3300
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Continuation stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval() -> u64 {
    2000
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl StreamingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("timestream-datasource").join("config.toml")),
            Some(PathBuf::from("/etc/timestream-datasource/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let ds = &mut self.datasource;
        for (key, slot) in [
            ("TIMESTREAM_DS_REGION", &mut ds.region),
            ("TIMESTREAM_DS_ENDPOINT", &mut ds.endpoint),
            ("TIMESTREAM_DS_PROFILE", &mut ds.profile),
            ("TIMESTREAM_DS_DEFAULT_DATABASE", &mut ds.default_database),
            ("TIMESTREAM_DS_DEFAULT_TABLE", &mut ds.default_table),
            ("TIMESTREAM_DS_DEFAULT_MEASURE", &mut ds.default_measure),
            ("TIMESTREAM_DS_HOST", &mut self.api.host),
            ("TIMESTREAM_DS_LOG_LEVEL", &mut self.logging.level),
            ("TIMESTREAM_DS_LOG_FORMAT", &mut self.logging.format),
        ] {
            if let Some(value) = var(key) {
                *slot = value;
            }
        }

        if let Some(port) = var("TIMESTREAM_DS_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Timestream Datasource Configuration
#
# Environment variables override these settings:
# - TIMESTREAM_DS_REGION
# - TIMESTREAM_DS_ENDPOINT
# - TIMESTREAM_DS_PROFILE
# - TIMESTREAM_DS_DEFAULT_DATABASE
# - TIMESTREAM_DS_DEFAULT_TABLE
# - TIMESTREAM_DS_DEFAULT_MEASURE
# - TIMESTREAM_DS_HOST
# - TIMESTREAM_DS_PORT
# - TIMESTREAM_DS_LOG_LEVEL
# - TIMESTREAM_DS_LOG_FORMAT

[datasource]
# Identifier used in stream channels (ds/<uid>/<queryId>)
uid = "timestream"

# Service region; empty or "default" uses default_region
region = ""
default_region = "us-east-1"

# Explicit query endpoint; leave empty for endpoint discovery
endpoint = ""

# Shared credentials profile
profile = ""

# Values for $__database, $__table and $__measure
default_database = ""
default_table = ""
default_measure = ""

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 3300

[streaming]
# Delay between continuation page fetches (ms)
tick_interval_ms = 2000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
