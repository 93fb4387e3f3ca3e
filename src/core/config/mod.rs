//! Configuration types and management for qualgate-rs.
//!
//! The configuration is a small YAML document with one section per concern:
//! indexing batch limits, the reference SQLite store, and logging.

pub mod validation;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{QualgateError, Result};

pub use validation::{validate_non_empty, validate_positive_u64, validate_positive_usize};

/// Main configuration for the qualgate engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualgateConfig {
    /// Incremental indexer settings
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Reference store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl QualgateConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            QualgateError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        serde_yaml::from_str(&content).map_err(Into::into)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            QualgateError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.indexing.validate()?;
        self.store.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Incremental indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Rows converted and upserted per batch
    #[serde(default = "IndexingConfig::default_bulk_size")]
    pub bulk_size: usize,

    /// Keys sent per delete request to the search index
    #[serde(default = "IndexingConfig::default_delete_chunk_size")]
    pub delete_chunk_size: usize,

    /// Rebuild indexes on startup even when they already hold documents
    #[serde(default)]
    pub force_startup_indexing: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            bulk_size: Self::default_bulk_size(),
            delete_chunk_size: Self::default_delete_chunk_size(),
            force_startup_indexing: false,
        }
    }
}

impl IndexingConfig {
    const fn default_bulk_size() -> usize {
        500
    }

    const fn default_delete_chunk_size() -> usize {
        1000
    }

    /// Validate indexing limits
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.bulk_size, "indexing.bulk_size")?;
        validate_positive_usize(self.delete_chunk_size, "indexing.delete_chunk_size")?;
        Ok(())
    }
}

/// Reference SQLite store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file path
    #[serde(default = "StoreConfig::default_path")]
    pub path: PathBuf,

    /// Busy timeout applied to every connection, in milliseconds
    #[serde(default = "StoreConfig::default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            busy_timeout_ms: Self::default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("qualgate.db")
    }

    const fn default_busy_timeout_ms() -> u64 {
        5_000
    }

    /// Validate store settings
    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.path.to_string_lossy(), "store.path")?;
        validate_positive_u64(self.busy_timeout_ms, "store.busy_timeout_ms")?;
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    /// Validate logging settings
    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.level, "logging.level")
    }
}

#[cfg(test)]
mod tests;
