//! Error types for the toolgate CLI.

use toolgate::{ProviderError, ToolError};

use crate::config::ConfigError;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog, authorization or tool execution failed.
    #[error(transparent)]
    Gate(#[from] toolgate::Error),

    /// Console I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for CliError {
    fn from(err: ProviderError) -> Self {
        Self::Gate(err.into())
    }
}

impl From<ToolError> for CliError {
    fn from(err: ToolError) -> Self {
        Self::Gate(err.into())
    }
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
