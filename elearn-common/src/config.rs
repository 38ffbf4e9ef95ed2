//! Bootstrap configuration loading
//!
//! Resolution order for each setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is never fatal: a warning is logged and the
//! remaining sources apply. A file that exists but does not parse, or that
//! holds invalid progress weights, is a configuration error.

use crate::progress::ProgressPolicy;
use crate::sequence::ReorderStrategy;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_DATABASE: &str = "ELEARN_DATABASE";
pub const ENV_PORT: &str = "ELEARN_PORT";
pub const ENV_CONFIG: &str = "ELEARN_CONFIG";

/// On-disk TOML layout; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub progress: Option<ProgressPolicy>,
    #[serde(default)]
    pub sequence: SequenceConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceConfig {
    pub reorder_strategy: Option<ReorderStrategy>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub progress: ProgressPolicy,
    pub reorder_strategy: ReorderStrategy,
}

impl ServiceConfig {
    /// Resolve configuration from CLI, environment, config file and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml = match config_path {
            Some(path) => load_toml(&path)?,
            None => {
                warn!("Could not determine a config directory, using defaults");
                TomlConfig::default()
            }
        };

        Self::merge(cli, toml)
    }

    /// Combine CLI and environment overrides with an already loaded file
    pub fn merge(cli: &CliOverrides, toml: TomlConfig) -> Result<Self> {
        let database_path = match &cli.database {
            Some(path) => path.clone(),
            None => match std::env::var(ENV_DATABASE) {
                Ok(path) => PathBuf::from(path),
                Err(_) => toml.database_path.unwrap_or_else(default_database_path),
            },
        };

        let port = match cli.port {
            Some(port) => port,
            None => match std::env::var(ENV_PORT) {
                Ok(raw) => raw.parse::<u16>().map_err(|e| {
                    Error::Config(format!("{}='{}' is not a valid port: {}", ENV_PORT, raw, e))
                })?,
                Err(_) => toml.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let host = cli
            .host
            .clone()
            .or(toml.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let progress = toml.progress.unwrap_or_default();
        progress.validate()?;

        Ok(Self {
            database_path,
            host,
            port,
            log_level: toml
                .logging
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            progress,
            reorder_strategy: toml.sequence.reorder_strategy.unwrap_or_default(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a TOML config file, returning defaults when it does not exist
pub fn load_toml(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    debug!("Config file contents: {:?}", config);
    Ok(config)
}

/// `<config_dir>/elearn/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("elearn").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("elearn"))
        .unwrap_or_else(|| PathBuf::from("./elearn_data"))
        .join("elearn.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_toml() {
        let config: TomlConfig = toml::from_str(
            r#"
            database_path = "/tmp/elearn.db"
            port = 6000

            [logging]
            level = "debug"

            [progress]
            video_weight = 0.3
            test_weight = 0.7

            [sequence]
            reorder_strategy = "swap"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(6000));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.progress.map(|p| p.test_weight), Some(0.7));
        assert_eq!(config.sequence.reorder_strategy, Some(ReorderStrategy::Swap));
    }

    #[test]
    fn test_partial_progress_section_keeps_defaults() {
        let config: TomlConfig = toml::from_str("[progress]\nvideo_weight = 1.0\n").unwrap();
        let progress = config.progress.unwrap();
        assert_eq!(progress.video_weight, 1.0);
        assert_eq!(progress.test_weight, 0.5);
    }

    #[test]
    fn test_default_database_path_is_named() {
        assert!(default_database_path().ends_with("elearn.db"));
    }
}
