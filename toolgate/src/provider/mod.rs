//! Managed tool providers.
//!
//! A [`ToolProvider`] owns the tool catalog, the per-(user, tool)
//! authorization records and the remote execution of tools. Local code
//! only sees [`ToolDefinition`]s and [`RemoteTool`] handles.
//!
//! # Available Providers
//!
//! | Provider | Catalog | Authorization | Execution |
//! |----------|---------|---------------|-----------|
//! | Arcade   | ✓       | ✓             | ✓         |

mod arcade;
mod remote;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::Authorization;
use crate::error::{ProviderError, ToolError};
use crate::tool::{SharedTool, ToolDefinition, ToolResult};

pub use arcade::{ArcadeClient, ArcadeConfig, to_agent_name, to_qualified_name};
pub use remote::RemoteTool;

/// Default number of tools requested per toolkit.
pub const DEFAULT_TOOL_LIMIT: usize = 100;

/// Which tools to fetch from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolQuery {
    /// Individual tools, by agent-facing name.
    pub tools: Vec<String>,
    /// Whole toolkits, by name.
    pub toolkits: Vec<String>,
    /// Maximum number of tools fetched per toolkit.
    pub limit: usize,
}

impl Default for ToolQuery {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            toolkits: Vec::new(),
            limit: DEFAULT_TOOL_LIMIT,
        }
    }
}

impl ToolQuery {
    /// Create an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add individual tools.
    #[must_use]
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    /// Add toolkits.
    #[must_use]
    pub fn with_toolkits<I, S>(mut self, toolkits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.toolkits.extend(toolkits.into_iter().map(Into::into));
        self
    }

    /// Set the per-toolkit limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Check if the query names nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.toolkits.is_empty()
    }
}

/// Outcome of a remote tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    /// Whether the tool reported success.
    pub success: bool,
    /// Output value, if any.
    pub value: Option<Value>,
    /// Tool-side error message, if any.
    pub error: Option<String>,
}

impl ExecutionOutput {
    /// A successful execution.
    #[must_use]
    pub const fn success(value: Value) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
        }
    }

    /// A failed execution.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(message.into()),
        }
    }

    /// Convert into the result the agent sees.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Execution`] when the provider reported a
    /// tool-side failure.
    pub fn into_result(self, tool_name: &str) -> ToolResult<Value> {
        if self.success {
            return Ok(self.value.unwrap_or(Value::Null));
        }
        let message = self
            .error
            .unwrap_or_else(|| format!("tool '{tool_name}' reported failure"));
        Err(ToolError::execution(message))
    }
}

/// A remote catalog, authorization and execution service.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch tool definitions. Names are agent-facing (`Toolkit_Tool`).
    async fn list_tools(&self, query: &ToolQuery) -> Result<Vec<ToolDefinition>, ProviderError>;

    /// Start (or look up) the authorization of `tool_name` for `user_id`.
    async fn authorize(
        &self,
        tool_name: &str,
        user_id: &str,
    ) -> Result<Authorization, ProviderError>;

    /// Long-poll the status of an authorization for up to `wait`.
    async fn authorization_status(
        &self,
        id: &str,
        wait: Duration,
    ) -> Result<Authorization, ProviderError>;

    /// Execute `tool_name` with `input` on behalf of `user_id`.
    async fn execute(
        &self,
        tool_name: &str,
        input: Value,
        user_id: &str,
    ) -> Result<ExecutionOutput, ProviderError>;
}

/// A boxed tool provider.
pub type BoxedToolProvider = Box<dyn ToolProvider>;

/// A shared tool provider.
pub type SharedToolProvider = Arc<dyn ToolProvider>;

/// Fetch the catalog for `query` and bind every tool to `user_id`.
///
/// Tools come back in query order with duplicates removed.
///
/// # Errors
///
/// Returns the provider error if the catalog cannot be fetched.
pub async fn catalog(
    provider: &SharedToolProvider,
    query: &ToolQuery,
    user_id: &str,
) -> Result<Vec<SharedTool>, ProviderError> {
    let definitions = provider.list_tools(query).await?;
    let mut seen = HashSet::new();
    let tools: Vec<SharedTool> = definitions
        .into_iter()
        .filter(|def| seen.insert(def.name.clone()))
        .map(|def| Arc::new(RemoteTool::new(Arc::clone(provider), def, user_id)) as SharedTool)
        .collect();

    tracing::debug!(
        provider = provider.name(),
        count = tools.len(),
        "Tool catalog retrieved"
    );
    Ok(tools)
}
