//! Tool trait and the catalog handed to an agent runtime.
//!
//! A tool is a named invocation handle: it takes JSON arguments and
//! returns a JSON value or a [`ToolError`]. Tools exposed to the agent live
//! in a [`ToolBox`] together with their [`ToolExecutionPolicy`].
//!
//! # OpenAI API Alignment
//!
//! [`ToolDefinition`] serializes to the `{"type": "function", "function": {...}}`
//! format so a runtime can forward the catalog to a chat completion request
//! unchanged.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::callback::{NoopAgentHooks, RunContext, SharedAgentHooks};
use crate::error::ToolError;

/// A type alias for `Result<T, ToolError>`.
pub type ToolResult<T> = Result<T, ToolError>;

/// Definition of a tool for LLM function calling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[non_exhaustive]
pub struct ToolDefinition {
    /// Name of the tool as the agent sees it (e.g., `Gmail_SendEmail`).
    pub name: String,

    /// Description of what the tool does.
    #[serde(default)]
    pub description: String,

    /// JSON schema for the tool's parameters.
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl ToolDefinition {
    /// Create a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Create a definition for a tool that takes no parameters.
    #[must_use]
    pub fn without_parameters(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, empty_object_schema())
    }

    /// Returns the tool name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Custom serialization to OpenAI function calling format.
impl Serialize for ToolDefinition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut function = serde_json::Map::new();
        function.insert("name".to_owned(), Value::String(self.name.clone()));
        function.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        function.insert("parameters".to_owned(), self.parameters.clone());

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry("function", &function)?;
        map.end()
    }
}

/// Object-safe invocation handle for a tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of the tool.
    fn name(&self) -> &str;

    /// Get the tool definition for LLM function calling.
    fn definition(&self) -> ToolDefinition;

    /// Call the tool with JSON arguments.
    async fn call(&self, args: Value) -> ToolResult<Value>;
}

/// A boxed dynamic tool.
pub type BoxedTool = Box<dyn Tool>;

/// A shared dynamic tool; the form the gate and the catalog pass around.
pub type SharedTool = Arc<dyn Tool>;

/// Normalize tool arguments that arrive as a JSON-encoded string.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArguments`] if the string is not valid JSON.
pub fn normalize_args(args: Value) -> ToolResult<Value> {
    match args {
        Value::String(s) => Ok(serde_json::from_str(&s)?),
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        other => Ok(other),
    }
}

/// A tool backed by an async closure.
///
/// Handy for local tools and for tests.
pub struct FnTool<F> {
    definition: ToolDefinition,
    func: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<Value>> + Send + 'static,
{
    /// Create a tool from a definition and an async closure.
    #[must_use]
    pub const fn new(definition: ToolDefinition, func: F) -> Self {
        Self { definition, func }
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<Value>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        (self.func)(normalize_args(args)?).await
    }
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

/// Execution policy for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ToolExecutionPolicy {
    /// Agent can execute the tool autonomously without confirmation.
    #[default]
    Auto,
    /// Requires human confirmation before every execution.
    RequireConfirmation,
    /// Tool is never exposed and never executed.
    Forbidden,
}

impl ToolExecutionPolicy {
    /// Check if the policy allows autonomous execution.
    #[must_use]
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Check if the policy requires confirmation.
    #[must_use]
    pub const fn requires_confirmation(&self) -> bool {
        matches!(self, Self::RequireConfirmation)
    }

    /// Check if the policy forbids execution.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden)
    }
}

impl fmt::Display for ToolExecutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::RequireConfirmation => write!(f, "require_confirmation"),
            Self::Forbidden => write!(f, "forbidden"),
        }
    }
}

/// The set of tools exposed to an agent, in insertion order.
pub struct ToolBox {
    tools: Vec<SharedTool>,
    index: HashMap<String, usize>,
    policies: HashMap<String, ToolExecutionPolicy>,
    hooks: SharedAgentHooks,
}

impl Default for ToolBox {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            policies: HashMap::new(),
            hooks: Arc::new(NoopAgentHooks),
        }
    }
}

impl ToolBox {
    /// Create a new empty toolbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach lifecycle hooks notified around every [`ToolBox::call`].
    #[must_use]
    pub fn with_hooks(mut self, hooks: SharedAgentHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the lifecycle hooks.
    pub fn set_hooks(&mut self, hooks: SharedAgentHooks) {
        self.hooks = hooks;
    }

    /// Add a shared tool, replacing any tool with the same name.
    pub fn add(&mut self, tool: SharedTool) {
        let name = tool.name().to_owned();
        if let Some(&slot) = self.index.get(&name) {
            self.tools[slot] = tool;
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Add a shared tool with an execution policy.
    pub fn add_with_policy(&mut self, tool: SharedTool, policy: ToolExecutionPolicy) {
        let name = tool.name().to_owned();
        self.add(tool);
        self.policies.insert(name, policy);
    }

    /// Get a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SharedTool> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    /// Get all tool definitions.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Get the names of all tools.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Check if the toolbox contains a tool with the given name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get the number of tools in the toolbox.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the toolbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Set the execution policy for a tool.
    pub fn set_policy(&mut self, tool_name: impl Into<String>, policy: ToolExecutionPolicy) {
        self.policies.insert(tool_name.into(), policy);
    }

    /// Get the execution policy for a tool.
    #[must_use]
    pub fn get_policy(&self, tool_name: &str) -> ToolExecutionPolicy {
        self.policies.get(tool_name).copied().unwrap_or_default()
    }

    /// Check if a tool requires confirmation.
    #[must_use]
    pub fn requires_confirmation(&self, tool_name: &str) -> bool {
        self.get_policy(tool_name).requires_confirmation()
    }

    /// Check if a tool is forbidden.
    #[must_use]
    pub fn is_forbidden(&self, tool_name: &str) -> bool {
        self.get_policy(tool_name).is_forbidden()
    }

    /// Call a tool by name with JSON arguments.
    ///
    /// Hooks see `on_tool_start` before and `on_tool_end` after the
    /// invocation, whether it succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Forbidden`] for forbidden tools,
    /// [`ToolError::NotFound`] for unknown names, or whatever the tool
    /// itself returns (including [`ToolError::Denied`]).
    pub async fn call(&self, ctx: &RunContext, name: &str, args: Value) -> ToolResult<Value> {
        if self.is_forbidden(name) {
            tracing::warn!(tool = name, "Refusing forbidden tool");
            return Err(ToolError::forbidden(name));
        }
        let tool = self.get(name).ok_or_else(|| ToolError::not_found(name))?;

        self.hooks.on_tool_start(ctx, name).await;
        let result = tool.call(args).await;
        let summary = match &result {
            Ok(value) => value.to_string(),
            Err(e) => format!("Error: {e}"),
        };
        self.hooks.on_tool_end(ctx, name, &summary).await;
        result
    }
}

impl fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.names())
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo(name: &str) -> SharedTool {
        Arc::new(FnTool::new(
            ToolDefinition::without_parameters(name, format!("Echo tool {name}")),
            |args| async move { Ok(serde_json::json!({"received": args})) },
        ))
    }

    mod tool_definition {
        use super::*;

        fn sample_parameters() -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "recipient": {"type": "string"}
                },
                "required": ["recipient"]
            })
        }

        #[test]
        fn new_creates_definition() {
            let def = ToolDefinition::new("Gmail_SendEmail", "Send an email", sample_parameters());
            assert_eq!(def.name(), "Gmail_SendEmail");
            assert_eq!(def.description(), "Send an email");
            assert_eq!(def.parameters["required"][0], "recipient");
        }

        #[test]
        fn without_parameters_uses_empty_object() {
            let def = ToolDefinition::without_parameters("Slack_WhoAmI", "Who am I");
            assert_eq!(def.parameters["type"], "object");
            assert!(def.parameters["properties"].as_object().unwrap().is_empty());
        }

        #[test]
        fn serialize_to_openai_format() {
            let def = ToolDefinition::new("Gmail_SendEmail", "Send", sample_parameters());
            let json = serde_json::to_value(&def).unwrap();
            assert_eq!(json["type"], "function");
            assert_eq!(json["function"]["name"], "Gmail_SendEmail");
            assert_eq!(json["function"]["description"], "Send");
            assert!(json["function"]["parameters"].is_object());
        }

        #[test]
        fn deserialize_from_simple_format_with_defaults() {
            let def: ToolDefinition = serde_json::from_str(r#"{"name": "bare"}"#).unwrap();
            assert_eq!(def.name, "bare");
            assert!(def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");
        }
    }

    mod fn_tool {
        use super::*;

        #[tokio::test]
        async fn call_runs_closure() {
            let tool = echo("echo");
            let out = tool.call(serde_json::json!({"a": 1})).await.unwrap();
            assert_eq!(out["received"]["a"], 1);
        }

        #[tokio::test]
        async fn call_parses_string_arguments() {
            let tool = echo("echo");
            let out = tool
                .call(Value::String(r#"{"a": 2}"#.to_owned()))
                .await
                .unwrap();
            assert_eq!(out["received"]["a"], 2);
        }

        #[tokio::test]
        async fn call_rejects_malformed_string_arguments() {
            let tool = echo("echo");
            let err = tool
                .call(Value::String("{not json".to_owned()))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }

        #[tokio::test]
        async fn null_arguments_become_empty_object() {
            let tool = echo("echo");
            let out = tool.call(Value::Null).await.unwrap();
            assert_eq!(out["received"], serde_json::json!({}));
        }

        #[test]
        fn debug_shows_name() {
            let tool = FnTool::new(ToolDefinition::without_parameters("dbg", ""), |_| async {
                Ok(Value::Null)
            });
            assert!(format!("{tool:?}").contains("dbg"));
        }
    }

    mod tool_execution_policy {
        use super::*;

        #[test]
        fn default_is_auto() {
            assert_eq!(ToolExecutionPolicy::default(), ToolExecutionPolicy::Auto);
        }

        #[test]
        fn predicates() {
            assert!(ToolExecutionPolicy::Auto.is_auto());
            assert!(ToolExecutionPolicy::RequireConfirmation.requires_confirmation());
            assert!(ToolExecutionPolicy::Forbidden.is_forbidden());
            assert!(!ToolExecutionPolicy::Auto.requires_confirmation());
            assert!(!ToolExecutionPolicy::RequireConfirmation.is_forbidden());
        }

        #[test]
        fn display_matches_serde_names() {
            for policy in [
                ToolExecutionPolicy::Auto,
                ToolExecutionPolicy::RequireConfirmation,
                ToolExecutionPolicy::Forbidden,
            ] {
                let json = serde_json::to_string(&policy).unwrap();
                assert_eq!(json, format!("\"{policy}\""));
            }
        }
    }

    mod tool_box {
        use super::*;
        use crate::callback::AgentHooks;

        #[derive(Default)]
        struct CountingHooks {
            starts: AtomicUsize,
            ends: AtomicUsize,
        }

        #[async_trait]
        impl AgentHooks for CountingHooks {
            async fn on_tool_start(&self, _ctx: &RunContext, _tool_name: &str) {
                self.starts.fetch_add(1, Ordering::SeqCst);
            }

            async fn on_tool_end(&self, _ctx: &RunContext, _tool_name: &str, _result: &str) {
                self.ends.fetch_add(1, Ordering::SeqCst);
            }
        }

        #[test]
        fn new_creates_empty_toolbox() {
            let toolbox = ToolBox::new();
            assert!(toolbox.is_empty());
            assert_eq!(toolbox.len(), 0);
        }

        #[test]
        fn names_keep_insertion_order() {
            let mut toolbox = ToolBox::new();
            toolbox.add(echo("zeta"));
            toolbox.add(echo("alpha"));
            toolbox.add(echo("mid"));
            assert_eq!(toolbox.names(), vec!["zeta", "alpha", "mid"]);
            assert_eq!(toolbox.definitions()[1].name, "alpha");
        }

        #[test]
        fn add_replaces_same_name() {
            let mut toolbox = ToolBox::new();
            toolbox.add(echo("dup"));
            toolbox.add(echo("dup"));
            assert_eq!(toolbox.len(), 1);
            assert!(toolbox.contains("dup"));
        }

        #[test]
        fn get_returns_none_for_missing() {
            let toolbox = ToolBox::new();
            assert!(toolbox.get("nonexistent").is_none());
        }

        #[test]
        fn policies_default_to_auto() {
            let mut toolbox = ToolBox::new();
            toolbox.add_with_policy(echo("send"), ToolExecutionPolicy::RequireConfirmation);
            toolbox.set_policy("drop", ToolExecutionPolicy::Forbidden);
            assert!(toolbox.requires_confirmation("send"));
            assert!(toolbox.is_forbidden("drop"));
            assert_eq!(toolbox.get_policy("unknown"), ToolExecutionPolicy::Auto);
        }

        #[tokio::test]
        async fn call_executes_tool_and_notifies_hooks() {
            let hooks = Arc::new(CountingHooks::default());
            let mut toolbox = ToolBox::new().with_hooks(Arc::clone(&hooks) as SharedAgentHooks);
            toolbox.add(echo("echo"));

            let ctx = RunContext::default();
            let out = toolbox
                .call(&ctx, "echo", serde_json::json!({"x": 1}))
                .await
                .unwrap();
            assert_eq!(out["received"]["x"], 1);
            assert_eq!(hooks.starts.load(Ordering::SeqCst), 1);
            assert_eq!(hooks.ends.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn call_returns_not_found_without_hooks() {
            let hooks = Arc::new(CountingHooks::default());
            let toolbox = ToolBox::new().with_hooks(Arc::clone(&hooks) as SharedAgentHooks);
            let err = toolbox
                .call(&RunContext::default(), "missing", Value::Null)
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::NotFound(_)));
            assert_eq!(hooks.starts.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn call_refuses_forbidden_tool() {
            let mut toolbox = ToolBox::new();
            toolbox.add_with_policy(echo("danger"), ToolExecutionPolicy::Forbidden);
            let err = toolbox
                .call(&RunContext::default(), "danger", Value::Null)
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::Forbidden(name) if name == "danger"));
        }

        #[test]
        fn debug_format() {
            let mut toolbox = ToolBox::new();
            toolbox.add(echo("visible"));
            let debug = format!("{toolbox:?}");
            assert!(debug.contains("ToolBox"));
            assert!(debug.contains("visible"));
        }
    }
}
