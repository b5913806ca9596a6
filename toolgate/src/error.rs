//! Unified error types for toolgate.
//!
//! This module provides the error hierarchy covering:
//! - Authorization failures (fatal at startup)
//! - Tool invocation errors, including the denial signal
//! - Tool provider (HTTP) errors

use std::fmt;

/// Result type alias for toolgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for toolgate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The tool provider could not establish authorization for a tool and user.
    #[error("Authorization failed for tool '{tool_name}' (user '{user_id}'): {reason}")]
    AuthorizationFailed {
        /// The tool that was being authorized.
        tool_name: String,
        /// The user identity the authorization was requested for.
        user_id: String,
        /// Why the authorization could not complete.
        reason: String,
    },

    /// Tool invocation error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Tool provider error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Agent runtime error.
    #[error("Agent error: {0}")]
    Agent(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an agent error with a message.
    #[must_use]
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Create an authorization failure.
    #[must_use]
    pub fn authorization_failed(
        tool_name: impl Into<String>,
        user_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::AuthorizationFailed {
            tool_name: tool_name.into(),
            user_id: user_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns the tool name if this error is a denied tool call.
    #[must_use]
    pub fn denied_tool(&self) -> Option<&str> {
        match self {
            Self::Tool(err) => err.denied_tool(),
            _ => None,
        }
    }

    /// Check if this error is a denied tool call.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.denied_tool().is_some()
    }
}

/// Error type for tool provider operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderError {
    /// The error kind.
    pub kind: ProviderErrorKind,
    /// The provider name (e.g., "arcade").
    pub provider: Option<String>,
    /// Additional error message.
    pub message: String,
    /// Optional error code (HTTP status or provider code).
    pub code: Option<String>,
}

/// Categories of tool provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderErrorKind {
    /// Missing or rejected credentials.
    Auth,
    /// Network or connection error.
    Network,
    /// Non-success HTTP status.
    HttpStatus,
    /// Response body did not match the expected shape.
    Decode,
    /// Request could not be built (bad URL, bad name).
    InvalidRequest,
}

impl ProviderError {
    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Auth,
            provider: Some(provider.into()),
            message: message.into(),
            code: None,
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Network,
            provider: None,
            message: message.into(),
            code: None,
        }
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::HttpStatus,
            provider: None,
            message: format!("HTTP {status}: {}", body.into()),
            code: Some(status.to_string()),
        }
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Decode,
            provider: None,
            message: format!("Expected {}, got {}", expected.into(), got.into()),
            code: None,
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            provider: None,
            message: message.into(),
            code: None,
        }
    }

    /// Attach the provider name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Check if this is a retryable error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind, ProviderErrorKind::Network)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{provider}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            Self::decode("valid JSON body", err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ProviderError {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_request(format!("Invalid URL: {err}"))
    }
}

/// Error type for tool invocation failures.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Error during tool execution.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Invalid arguments provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Tool execution is forbidden by policy.
    #[error("Tool '{0}' is forbidden by policy")]
    Forbidden(String),

    /// The operator declined the tool call.
    #[error("Tool call to '{0}' was denied by the user")]
    Denied(String),

    /// Generic error.
    #[error("Tool error: {0}")]
    Other(String),
}

impl ToolError {
    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create an invalid arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a forbidden error.
    #[must_use]
    pub fn forbidden(tool_name: impl Into<String>) -> Self {
        Self::Forbidden(tool_name.into())
    }

    /// Create the denial signal for a tool call.
    #[must_use]
    pub fn denied(tool_name: impl Into<String>) -> Self {
        Self::Denied(tool_name.into())
    }

    /// Returns the tool name if this is the denial signal.
    #[must_use]
    pub fn denied_tool(&self) -> Option<&str> {
        match self {
            Self::Denied(name) => Some(name),
            _ => None,
        }
    }
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for ToolError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_owned())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

impl From<ProviderError> for ToolError {
    fn from(err: ProviderError) -> Self {
        Self::Execution(err.to_string())
    }
}
