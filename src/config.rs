//! Configuration management for the upload manager
//!
//! Values are layered: built-in defaults, then an optional `config.toml`,
//! then `UPLOAD_MANAGER_*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::storage::DEFAULT_MAX_FILE_SIZE;

const ENV_PREFIX: &str = "UPLOAD_MANAGER";
const DEFAULT_CONFIG_PATH: &str = "config";
const BYTES_PER_MB: u64 = 1024 * 1024;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STORAGE_DIR: &str = "uploads";

/// Server configuration, loaded once at startup
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// Listening port
    /// Environment: UPLOAD_MANAGER_PORT
    pub port: u16,

    /// Directory holding the stored files, relative to the working directory
    /// unless absolute
    /// Environment: UPLOAD_MANAGER_STORAGE_DIR
    pub storage_dir: String,

    /// Maximum upload size in MB
    pub max_file_size_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            storage_dir: DEFAULT_STORAGE_DIR.to_string(),
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE / BYTES_PER_MB,
        }
    }
}

impl ServerConfig {
    /// Load configuration from ./config.toml (if present) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from `path` (extension optional) with environment overrides
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        load_with_env(path, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    /// Socket address string for the listener
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn storage_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_dir)
    }

    /// Get maximum file size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(BYTES_PER_MB)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Message("bind_address cannot be empty".into()));
        }

        if self.storage_dir.trim().is_empty() {
            return Err(ConfigError::Message("storage_dir cannot be empty".into()));
        }

        if self.max_file_size_mb == 0 {
            return Err(ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        if self.max_file_size_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(ConfigError::Message("max_file_size_mb is too large".into()));
        }

        Ok(())
    }
}

fn load_with_env(path: &str, env: Environment) -> Result<ServerConfig, ConfigError> {
    let defaults = ServerConfig::default();

    let settings = Config::builder()
        .set_default("bind_address", defaults.bind_address)?
        .set_default("port", i64::from(defaults.port))?
        .set_default("storage_dir", defaults.storage_dir)?
        .set_default("max_file_size_mb", defaults.max_file_size_mb as i64)?
        .add_source(File::with_name(path).required(false))
        .add_source(env)
        .build()?;

    let config: ServerConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
