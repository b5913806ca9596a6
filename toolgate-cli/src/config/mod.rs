//! Configuration management for the toolgate CLI.
//!
//! Settings come from, in increasing priority:
//! 1. Default values
//! 2. Config file (`~/.toolgate/config.toml`)
//! 3. Environment variables (`.env` included)

mod schema;

pub use schema::{IssueLevel, ToolgateConfig};

use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// Missing required field.
    #[error("missing required config: {0}")]
    MissingField(String),
    /// Invalid value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Get the default config directory path.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolgate")
}

/// Get the default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load the file at `path`, or defaults if it does not exist.
///
/// Environment overrides are not applied.
///
/// # Errors
///
/// Returns an I/O or TOML error if the file exists but cannot be read.
pub async fn load_config_from(path: &Path) -> ConfigResult<ToolgateConfig> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(ToolgateConfig::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: ToolgateConfig = toml::from_str(&content)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Load the file at `path` and apply environment overrides.
///
/// # Errors
///
/// See [`load_config_from`].
pub async fn load_effective(path: &Path) -> ConfigResult<ToolgateConfig> {
    Ok(load_config_from(path).await?.with_env())
}

/// Save configuration to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an I/O or TOML serialization error.
pub async fn save_config_to(config: &ToolgateConfig, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = toml::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), "saved config file");

    Ok(())
}

/// Write the default configuration to `path`.
///
/// Credentials are left out of the file; they are expected in the
/// environment.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the file exists and `force` is
/// not set, or the save error.
pub async fn init_config(path: &Path, force: bool) -> ConfigResult<ToolgateConfig> {
    if path.exists() && !force {
        return Err(ConfigError::InvalidValue(format!(
            "{} already exists",
            path.display()
        )));
    }
    let config = ToolgateConfig::default();
    save_config_to(&config, path).await?;
    Ok(config)
}
