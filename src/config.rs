//! Configuration management for the access layer
//!
//! This module provides configuration file support with TOML format,
//! environment variable overrides, and sensible defaults.
//!
//! ```toml
//! [repository]
//! max_rows = 100
//! debug = false
//!
//! [row_key]
//! separator = "#"
//! process = "reverse_if_integer"
//!
//! [mapping]
//! path = "mappings/ecommerce.json"
//! environment = "production"
//! operation_timeout_secs = 50
//!
//! [logging]
//! log_level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mapping::MappingStoreConfig;
use crate::repository::RepositoryConfig;
use crate::rowkey::{KeyPartProcessor, RowKeyConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Repository behaviour
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Row key construction
    #[serde(default)]
    pub row_key: RowKeySection,

    /// Mapping document location
    #[serde(default)]
    pub mapping: MappingSection,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Row key configuration as written in the file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RowKeySection {
    /// Separator between key parts
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Part processor: `reverse_if_integer`, `reverse` or `identity`
    #[serde(default = "default_process")]
    pub process: String,
}

/// Mapping document configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingSection {
    /// Local mapping document
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Root directory of the local object store holding versioned documents
    #[serde(default)]
    pub store_root: Option<PathBuf>,

    /// Environment segment of versioned document paths
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Time allowed for one store operation, in seconds
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_separator() -> String { crate::rowkey::DEFAULT_SEPARATOR.to_string() }
fn default_process() -> String { "reverse_if_integer".to_string() }
fn default_environment() -> String { "production".to_string() }
fn default_operation_timeout_secs() -> u64 { 50 }
fn default_log_level() -> String { "info".to_string() }

impl Default for RowKeySection {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            process: default_process(),
        }
    }
}

impl Default for MappingSection {
    fn default() -> Self {
        Self {
            path: None,
            store_root: None,
            environment: default_environment(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl RowKeySection {
    /// Runtime row key configuration
    pub fn to_row_key_config(&self) -> Result<RowKeyConfig> {
        let process = KeyPartProcessor::from_name(&self.process).ok_or_else(|| {
            Error::Configuration(format!("Unknown row key processor: {}", self.process))
        })?;
        Ok(RowKeyConfig {
            separator: self.separator.clone(),
            process,
        })
    }
}

impl MappingSection {
    /// Runtime mapping store configuration
    pub fn store_config(&self) -> MappingStoreConfig {
        MappingStoreConfig {
            environment: self.environment.clone(),
            operation_timeout: Duration::from_secs(self.operation_timeout_secs),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Repository
        if let Ok(max_rows) = std::env::var("WCE_MAX_ROWS") {
            if let Ok(n) = max_rows.parse() {
                self.repository.max_rows = n;
            }
        }

        // Row key
        if let Ok(separator) = std::env::var("WCE_ROW_KEY_SEPARATOR") {
            self.row_key.separator = separator;
        }

        // Mapping
        if let Ok(path) = std::env::var("WCE_MAPPING_PATH") {
            self.mapping.path = Some(PathBuf::from(path));
        }
        if let Ok(environment) = std::env::var("WCE_ENVIRONMENT") {
            self.mapping.environment = environment;
        }

        // Logging
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.repository.max_rows == 0 {
            return Err(Error::Configuration("Max rows must be > 0".to_string()));
        }

        if self.row_key.separator.is_empty() {
            return Err(Error::Configuration(
                "Row key separator cannot be empty".to_string(),
            ));
        }
        self.row_key.to_row_key_config()?;

        if self.mapping.environment.is_empty() {
            return Err(Error::Configuration(
                "Mapping environment cannot be empty".to_string(),
            ));
        }
        if self.mapping.operation_timeout_secs == 0 {
            return Err(Error::Configuration(
                "Mapping operation timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }
}
