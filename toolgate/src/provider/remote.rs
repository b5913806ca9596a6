//! Invocation handles for provider-hosted tools.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool::{Tool, ToolDefinition, ToolResult, normalize_args};

use super::SharedToolProvider;

/// A tool executed by a [`ToolProvider`](super::ToolProvider) on behalf of
/// one user.
pub struct RemoteTool {
    provider: SharedToolProvider,
    definition: ToolDefinition,
    user_id: String,
}

impl RemoteTool {
    /// Bind `definition` to `provider` for `user_id`.
    #[must_use]
    pub fn new(
        provider: SharedToolProvider,
        definition: ToolDefinition,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            definition,
            user_id: user_id.into(),
        }
    }

    /// The user the tool executes for.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let input = normalize_args(args)?;
        tracing::debug!(
            tool = %self.definition.name,
            provider = self.provider.name(),
            user = %self.user_id,
            "Executing remote tool"
        );
        self.provider
            .execute(&self.definition.name, input, &self.user_id)
            .await?
            .into_result(&self.definition.name)
    }
}

impl fmt::Debug for RemoteTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTool")
            .field("name", &self.definition.name)
            .field("provider", &self.provider.name())
            .field("user_id", &self.user_id)
            .finish()
    }
}
