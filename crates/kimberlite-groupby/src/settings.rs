//! Evaluator limits and their loading.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `groupby.toml` in the project directory
//! 3. Environment variables (`KMB_GROUPBY_*`)

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap on groups formed for one row.
///
/// Each group holds its key values and identifier list; one million
/// single-key groups stays in the tens of megabytes.
pub const DEFAULT_MAX_GROUPS: usize = 1_000_000;

/// Default cap on aggregate fields per group-by block.
pub const DEFAULT_MAX_AGGREGATES: usize = 100;

/// Configuration file name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "groupby.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Limits applied while evaluating group-by blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByConfig {
    /// Maximum groups formed for a single row or variable pass.
    pub max_groups: usize,
    /// Maximum aggregate fields in one group-by block.
    pub max_aggregates: usize,
}

impl Default for GroupByConfig {
    fn default() -> Self {
        Self {
            max_groups: DEFAULT_MAX_GROUPS,
            max_aggregates: DEFAULT_MAX_AGGREGATES,
        }
    }
}

impl GroupByConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_groups == 0 {
            return Err(ConfigError::ValidationError(
                "max_groups must be at least 1".to_string(),
            ));
        }
        if self.max_aggregates == 0 {
            return Err(ConfigError::ValidationError(
                "max_aggregates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader rooted at the current directory
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "KMB_GROUPBY".to_string(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "KMB_GROUPBY")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<GroupByConfig> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&GroupByConfig::default())?);

        let config_file = self.project_dir.join(CONFIG_FILE_NAME);
        if config_file.exists() {
            builder = builder.add_source(
                config::File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: GroupByConfig = builder
            .build()
            .context("Failed to build groupby configuration")?
            .try_deserialize()
            .context("Failed to deserialize groupby configuration")?;

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
