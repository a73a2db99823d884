//! Configuration management for prismctl
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use prismctl::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Prism endpoint: {}", config.base_url());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `PRISMCTL__<section>__<key>`
//!
//! Examples:
//! - `PRISMCTL__CLUSTER__HOST=10.42.1.39`
//! - `PRISMCTL__TRANSPORT__VERIFY_TLS=true`
//! - `PRISMCTL__CLONE__MEMORY=8GiB`
//!
//! The password is only read from `PRISMCTL_PASSWORD`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/prismctl.toml`.
//! This can be overridden using the `PRISMCTL_CONFIG` environment variable
//! or the `--config` flag.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    ApiConfig, BatchConfig, CloneConfig, ClusterConfig, Config, ListingConfig, TransportConfig,
};
pub use validation::{ValidationError, require_credentials};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation fails.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, without reading secrets
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration as TOML. Secrets are never included.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
