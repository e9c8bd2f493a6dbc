//! Configuration System
//!
//! Layered configuration, lowest to highest precedence: built-in defaults,
//! the per-user file (`$XDG_CONFIG_HOME/tessera/config.toml`), the
//! repository file (`<repo>/.tessera/config.toml`) and finally environment
//! variables such as `TESSERA__REGION__MAX_DEPTH=6`.

use crate::commitment::OddNodePolicy;
use crate::error::ConfigError;
use crate::graph::GraphSettings;
use crate::logging::LoggingConfig;
use crate::merge::MergeConfig;
use crate::region::RegionParams;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;
pub use sources::repository_file::repository_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TesseraConfig {
    #[serde(default)]
    pub region: RegionParams,

    #[serde(default)]
    pub commitment: CommitmentConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitmentConfig {
    #[serde(default)]
    pub odd_node: OddNodePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry count at which the result cache is emptied.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_capacity() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Load the local keyring; encryption and signing fail when disabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl TesseraConfig {
    /// Validate the entire configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.region.max_depth == 0 {
            errors.push("region.max_depth must be at least 1".to_string());
        }
        if let Err(e) = self.region.validate() {
            errors.push(format!("region: {}", e));
        }
        if self.cache.capacity == 0 {
            errors.push("cache.capacity must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    pub fn graph_settings(&self) -> GraphSettings {
        GraphSettings {
            region: self.region.clone(),
            odd_node: self.commitment.odd_node,
            merge: self.merge.clone(),
        }
    }
}

/// Loads [`TesseraConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the effective configuration for a repository rooted at `repo_root`.
    pub fn load(repo_root: &Path) -> Result<TesseraConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder);
        let builder = sources::repository_file::add_to_builder(builder, repo_root);
        let builder = merge::merge_policy::add_environment(builder);

        let config: TesseraConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<TesseraConfig, ConfigError> {
        let config: TesseraConfig = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config` as TOML, creating parent directories.
    pub fn write(config: &TesseraConfig, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(config)?)?;
        Ok(())
    }
}
