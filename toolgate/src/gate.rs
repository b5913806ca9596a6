//! The tool authorization and confirmation gate.
//!
//! [`ToolGate`] sits between a tool catalog and the agent runtime:
//!
//! - every exposed tool is authorized once per user against the provider
//!   before its handle can be exercised;
//! - tools whose policy is [`ToolExecutionPolicy::RequireConfirmation`] are
//!   wrapped in a [`ConfirmedTool`] that asks the operator before every
//!   invocation;
//! - forbidden tools are never exposed.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolgate::prelude::*;
//!
//! let provider: SharedToolProvider = Arc::new(ArcadeClient::from_env()?);
//! let config = GateConfig::new("ops@example.com")
//!     .require_confirmation(["Gmail_SendEmail", "Slack_SendMessage"]);
//! let gate = ToolGate::new(Arc::clone(&provider), Arc::new(ConsoleConfirmation::stdio()), config);
//!
//! let tools = catalog(&provider, &ToolQuery::new().with_toolkits(["Gmail"]), gate.user_id()).await?;
//! let toolbox = gate.prepare(tools).await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::auth::{Authorization, LoggingAuthListener, SharedAuthorizationListener};
use crate::confirm::{ConfirmationDecision, SharedConfirmationHandler, ToolConfirmationRequest};
use crate::error::{Error, Result, ToolError};
use crate::provider::SharedToolProvider;
use crate::tool::{SharedTool, Tool, ToolBox, ToolDefinition, ToolExecutionPolicy, ToolResult};

/// Default long-poll wait per authorization status request.
pub const DEFAULT_AUTH_WAIT: Duration = Duration::from_secs(59);

/// Gate configuration: who the user is and which tools need what.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Identity every authorization and execution is performed for.
    pub user_id: String,
    /// Per-tool policies; absent names are [`ToolExecutionPolicy::Auto`].
    pub policies: HashMap<String, ToolExecutionPolicy>,
    /// Long-poll wait per authorization status request.
    pub auth_wait: Duration,
}

impl GateConfig {
    /// Create a configuration for `user_id` with no policies.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            policies: HashMap::new(),
            auth_wait: DEFAULT_AUTH_WAIT,
        }
    }

    /// Read the user identity from `ARCADE_USER_ID`.
    ///
    /// Returns `None` when the variable is unset or blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("ARCADE_USER_ID")
            .ok()
            .filter(|id| !id.trim().is_empty())
            .map(Self::new)
    }

    /// Set the policy for one tool.
    #[must_use]
    pub fn with_policy(mut self, tool_name: impl Into<String>, policy: ToolExecutionPolicy) -> Self {
        self.policies.insert(tool_name.into(), policy);
        self
    }

    /// Require confirmation for every named tool.
    #[must_use]
    pub fn require_confirmation<I, S>(mut self, tool_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in tool_names {
            self.policies
                .insert(name.into(), ToolExecutionPolicy::RequireConfirmation);
        }
        self
    }

    /// Forbid every named tool.
    #[must_use]
    pub fn forbid<I, S>(mut self, tool_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in tool_names {
            self.policies
                .insert(name.into(), ToolExecutionPolicy::Forbidden);
        }
        self
    }

    /// Set the long-poll wait per authorization status request.
    #[must_use]
    pub const fn with_auth_wait(mut self, wait: Duration) -> Self {
        self.auth_wait = wait;
        self
    }

    /// Policy for a tool.
    #[must_use]
    pub fn policy(&self, tool_name: &str) -> ToolExecutionPolicy {
        self.policies.get(tool_name).copied().unwrap_or_default()
    }
}

/// A tool that asks for confirmation before every invocation.
pub struct ConfirmedTool {
    inner: SharedTool,
    handler: SharedConfirmationHandler,
    attempts: AtomicU64,
}

/// Wrap `tool` so every call first asks `handler`.
///
/// On approval the original handle runs with the original arguments and its
/// result is returned unchanged; on denial the call fails with
/// [`ToolError::Denied`] and the original handle is not touched.
#[must_use]
pub fn wrap_with_confirmation(tool: SharedTool, handler: SharedConfirmationHandler) -> ConfirmedTool {
    ConfirmedTool {
        inner: tool,
        handler,
        attempts: AtomicU64::new(0),
    }
}

impl ConfirmedTool {
    /// The wrapped tool.
    #[must_use]
    pub const fn inner(&self) -> &SharedTool {
        &self.inner
    }
}

#[async_trait]
impl Tool for ConfirmedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn definition(&self) -> ToolDefinition {
        self.inner.definition()
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let name = self.inner.name();
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let request = ToolConfirmationRequest::new(format!("{name}-{attempt}"), name, args);

        tracing::info!(tool = name, attempt, "Requesting confirmation");
        match self.handler.confirm(&request).await {
            ConfirmationDecision::Approved => {
                tracing::info!(tool = name, attempt, "Tool call approved");
                self.inner.call(request.arguments).await
            }
            ConfirmationDecision::Denied => {
                tracing::warn!(tool = name, attempt, "Tool call denied");
                Err(ToolError::denied(name))
            }
        }
    }
}

impl fmt::Debug for ConfirmedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmedTool")
            .field("name", &self.inner.name())
            .finish_non_exhaustive()
    }
}

/// Authorizes tools against a provider and guards sensitive ones.
pub struct ToolGate {
    provider: SharedToolProvider,
    handler: SharedConfirmationHandler,
    listener: SharedAuthorizationListener,
    config: GateConfig,
    authorized: RwLock<HashSet<(String, String)>>,
}

impl ToolGate {
    /// Create a gate with the default (logging) authorization listener.
    #[must_use]
    pub fn new(
        provider: SharedToolProvider,
        handler: SharedConfirmationHandler,
        config: GateConfig,
    ) -> Self {
        Self {
            provider,
            handler,
            listener: Arc::new(LoggingAuthListener),
            config,
            authorized: RwLock::new(HashSet::new()),
        }
    }

    /// Replace the authorization listener.
    #[must_use]
    pub fn with_listener(mut self, listener: SharedAuthorizationListener) -> Self {
        self.listener = listener;
        self
    }

    /// The gate configuration.
    #[must_use]
    pub const fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The configured user identity.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    /// The provider the gate authorizes against.
    #[must_use]
    pub const fn provider(&self) -> &SharedToolProvider {
        &self.provider
    }

    /// Whether `(tool_name, user_id)` has completed authorization through
    /// this gate.
    pub async fn is_authorized(&self, tool_name: &str, user_id: &str) -> bool {
        self.authorized
            .read()
            .await
            .contains(&(tool_name.to_owned(), user_id.to_owned()))
    }

    /// Ensure `user_id` has authorized `tool_name` with the provider.
    ///
    /// Completed pairs are remembered; repeating the call for the same pair
    /// returns immediately. A pending authorization is reported to the
    /// listener and then waited on until the provider reports completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthorizationFailed`] for an empty tool name, a
    /// failed provider request, a `failed` status, or a pending response
    /// without an id to wait on.
    pub async fn authorize(&self, tool_name: &str, user_id: &str) -> Result<()> {
        if tool_name.trim().is_empty() {
            return Err(Error::authorization_failed(
                tool_name,
                user_id,
                "tool name must not be empty",
            ));
        }
        if self.is_authorized(tool_name, user_id).await {
            tracing::debug!(tool = tool_name, user = user_id, "Already authorized");
            return Ok(());
        }

        let fail = |reason: String| Error::authorization_failed(tool_name, user_id, reason);

        let auth = self
            .provider
            .authorize(tool_name, user_id)
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !auth.is_completed() {
            self.wait_for_completion(tool_name, user_id, auth).await?;
        }

        self.authorized
            .write()
            .await
            .insert((tool_name.to_owned(), user_id.to_owned()));
        tracing::info!(tool = tool_name, user = user_id, "Tool authorized");
        Ok(())
    }

    async fn wait_for_completion(
        &self,
        tool_name: &str,
        user_id: &str,
        auth: Authorization,
    ) -> Result<()> {
        let fail = |reason: String| Error::authorization_failed(tool_name, user_id, reason);

        if auth.status.is_failed() {
            return Err(fail("provider reported authorization failed".to_owned()));
        }
        self.listener
            .on_authorization_required(tool_name, user_id, &auth)
            .await;

        let id = auth
            .id
            .ok_or_else(|| fail("authorization response carried no id to wait on".to_owned()))?;

        loop {
            let current = self
                .provider
                .authorization_status(&id, self.config.auth_wait)
                .await
                .map_err(|e| fail(e.to_string()))?;

            if current.is_completed() {
                self.listener
                    .on_authorization_completed(tool_name, user_id)
                    .await;
                return Ok(());
            }
            if current.status.is_failed() {
                return Err(fail("provider reported authorization failed".to_owned()));
            }
            tracing::debug!(
                tool = tool_name,
                status = %current.status,
                "Authorization still pending"
            );
        }
    }

    /// Wrap `tool` with confirmation if its policy requires it.
    #[must_use]
    pub fn guard(&self, tool: SharedTool) -> SharedTool {
        if self.config.policy(tool.name()).requires_confirmation() {
            tracing::debug!(tool = tool.name(), "Guarding tool with confirmation");
            Arc::new(wrap_with_confirmation(tool, Arc::clone(&self.handler)))
        } else {
            tool
        }
    }

    /// Turn a catalog into the toolbox exposed to the agent.
    ///
    /// Forbidden tools are dropped; every other tool is guarded and then
    /// authorized for the configured user, in catalog order.
    ///
    /// # Errors
    ///
    /// Stops at the first [`Error::AuthorizationFailed`].
    pub async fn prepare(&self, tools: Vec<SharedTool>) -> Result<ToolBox> {
        let mut toolbox = ToolBox::new();
        for tool in tools {
            let name = tool.name().to_owned();
            let policy = self.config.policy(&name);
            if policy.is_forbidden() {
                tracing::info!(tool = %name, "Skipping forbidden tool");
                continue;
            }
            let guarded = self.guard(tool);
            self.authorize(&name, &self.config.user_id).await?;
            toolbox.add_with_policy(guarded, policy);
        }
        tracing::info!(count = toolbox.len(), "Toolbox prepared");
        Ok(toolbox)
    }
}

impl fmt::Debug for ToolGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolGate")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
