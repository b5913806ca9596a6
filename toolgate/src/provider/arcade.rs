//! Arcade tool provider.
//!
//! Arcade serves tool definitions, runs the OAuth consent flows for the
//! third-party services behind them, and executes tools on behalf of a
//! user. Tools are addressed by qualified name (`Toolkit.Tool`); the agent
//! sees them as `Toolkit_Tool`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

use crate::auth::Authorization;
use crate::error::ProviderError;
use crate::tool::ToolDefinition;

use super::{ExecutionOutput, ToolProvider, ToolQuery};

const PROVIDER: &str = "arcade";

/// Slack on top of the server-side wait for an authorization status poll.
const STATUS_POLL_GRACE: Duration = Duration::from_secs(30);

/// Configuration for the Arcade client.
#[derive(Debug, Clone)]
pub struct ArcadeConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ArcadeConfig {
    /// Default Arcade API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.arcade.dev";

    /// Default request timeout; must exceed the authorization long-poll.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `ARCADE_API_KEY` - Required API key
    /// - `ARCADE_BASE_URL` - Optional base URL
    ///
    /// # Errors
    ///
    /// Returns an auth error if `ARCADE_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("ARCADE_API_KEY").map_err(|_| {
            ProviderError::auth(PROVIDER, "ARCADE_API_KEY environment variable not set")
        })?;
        let base_url =
            std::env::var("ARCADE_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_owned());

        Ok(Self {
            api_key,
            base_url,
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Convert a qualified name (`Gmail.SendEmail`) to the agent-facing form
/// (`Gmail_SendEmail`).
#[must_use]
pub fn to_agent_name(qualified_name: &str) -> String {
    qualified_name.replacen('.', "_", 1)
}

/// Convert an agent-facing name (`Gmail_SendEmail`) to the qualified form
/// (`Gmail.SendEmail`). Names that are already qualified pass through.
#[must_use]
pub fn to_qualified_name(agent_name: &str) -> String {
    if agent_name.contains('.') {
        agent_name.to_owned()
    } else {
        agent_name.replacen('_', ".", 1)
    }
}

#[derive(Debug, Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    qualified_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    toolkit: WireToolkit,
    #[serde(default)]
    input: WireInput,
}

#[derive(Debug, Deserialize)]
struct WireToolkit {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireInput {
    #[serde(default)]
    parameters: Vec<WireParameter>,
}

#[derive(Debug, Deserialize)]
struct WireParameter {
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<String>,
    value_schema: WireValueSchema,
}

#[derive(Debug, Deserialize)]
struct WireValueSchema {
    val_type: String,
    #[serde(default)]
    inner_val_type: Option<String>,
    #[serde(default, rename = "enum")]
    enum_values: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    items: Vec<WireTool>,
}

#[derive(Debug, Deserialize)]
struct WireExecution {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    output: Option<WireOutput>,
}

#[derive(Debug, Deserialize)]
struct WireOutput {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<WireToolError>,
}

#[derive(Debug, Deserialize)]
struct WireToolError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// Map an Arcade value type to a JSON-schema type.
fn json_type(val_type: &str) -> &'static str {
    match val_type {
        "integer" => "integer",
        "number" => "number",
        "boolean" => "boolean",
        "array" => "array",
        "json" => "object",
        _ => "string",
    }
}

fn parameters_schema(parameters: &[WireParameter]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in parameters {
        let mut schema = Map::new();
        let schema_type = json_type(&param.value_schema.val_type);
        schema.insert("type".to_owned(), Value::from(schema_type));
        if let Some(description) = &param.description {
            schema.insert("description".to_owned(), Value::from(description.as_str()));
        }
        if let Some(values) = &param.value_schema.enum_values {
            schema.insert("enum".to_owned(), Value::from(values.clone()));
        }
        if schema_type == "array" {
            let inner = param
                .value_schema
                .inner_val_type
                .as_deref()
                .map_or("string", json_type);
            schema.insert("items".to_owned(), serde_json::json!({"type": inner}));
        }
        properties.insert(param.name.clone(), Value::Object(schema));
        if param.required {
            required.push(Value::from(param.name.as_str()));
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

impl From<WireTool> for ToolDefinition {
    fn from(tool: WireTool) -> Self {
        let qualified = tool
            .qualified_name
            .unwrap_or_else(|| format!("{}.{}", tool.toolkit.name, tool.name));
        Self::new(
            to_agent_name(&qualified),
            tool.description.unwrap_or_default(),
            parameters_schema(&tool.input.parameters),
        )
    }
}

/// Arcade API client.
#[derive(Debug, Clone)]
pub struct ArcadeClient {
    config: Arc<ArcadeConfig>,
    client: Client,
}

impl ArcadeClient {
    /// Create a new Arcade client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an auth error for an empty API key, or an invalid request
    /// error if the base URL does not parse or the HTTP client cannot be
    /// built.
    pub fn new(config: ArcadeConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::auth(PROVIDER, "API key is required"));
        }
        Url::parse(&config.base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let client = builder.build().map_err(|e| {
            ProviderError::invalid_request(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// See [`ArcadeConfig::from_env`] and [`ArcadeClient::new`].
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(ArcadeConfig::from_env()?)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::invalid_request("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::from(e).with_provider(PROVIDER))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from(e).with_provider(PROVIDER))?;
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::decode("valid Arcade response", format!("parse error: {e}"))
                .with_provider(PROVIDER)
        })
    }

    /// Parse an error response body.
    pub(crate) fn parse_error(status: u16, body: &str) -> ProviderError {
        let message = serde_json::from_str::<WireErrorBody>(body)
            .map_or_else(|_| body.to_owned(), |parsed| parsed.error);
        match status {
            401 | 403 => ProviderError::auth(PROVIDER, message),
            _ => ProviderError::http_status(status, message).with_provider(PROVIDER),
        }
    }

    /// Fetch a single tool definition by name (either form).
    ///
    /// # Errors
    ///
    /// Returns the HTTP, status or decode error.
    pub async fn get_tool(&self, name: &str) -> Result<ToolDefinition, ProviderError> {
        let qualified = to_qualified_name(name);
        let url = self.endpoint(&["v1", "tools", &qualified])?;
        let tool: WireTool = self.send(self.client.get(url)).await?;
        Ok(tool.into())
    }

    /// Fetch up to `limit` tool definitions of a toolkit.
    ///
    /// # Errors
    ///
    /// Returns the HTTP, status or decode error.
    pub async fn list_toolkit(
        &self,
        toolkit: &str,
        limit: usize,
    ) -> Result<Vec<ToolDefinition>, ProviderError> {
        let mut url = self.endpoint(&["v1", "tools"])?;
        url.query_pairs_mut()
            .append_pair("toolkit", toolkit)
            .append_pair("limit", &limit.to_string());
        let page: WirePage = self.send(self.client.get(url)).await?;
        Ok(page.items.into_iter().map(ToolDefinition::from).collect())
    }
}

#[async_trait]
impl ToolProvider for ArcadeClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn list_tools(&self, query: &ToolQuery) -> Result<Vec<ToolDefinition>, ProviderError> {
        let mut seen = HashSet::new();
        let mut definitions = Vec::new();

        for name in &query.tools {
            let def = self.get_tool(name).await?;
            if seen.insert(def.name.clone()) {
                definitions.push(def);
            }
        }
        for toolkit in &query.toolkits {
            for def in self.list_toolkit(toolkit, query.limit).await? {
                if seen.insert(def.name.clone()) {
                    definitions.push(def);
                }
            }
        }

        tracing::debug!(count = definitions.len(), "Arcade catalog fetched");
        Ok(definitions)
    }

    async fn authorize(
        &self,
        tool_name: &str,
        user_id: &str,
    ) -> Result<Authorization, ProviderError> {
        let url = self.endpoint(&["v1", "tools", "authorize"])?;
        let body = serde_json::json!({
            "tool_name": to_qualified_name(tool_name),
            "user_id": user_id,
        });
        self.send(self.client.post(url).json(&body)).await
    }

    async fn authorization_status(
        &self,
        id: &str,
        wait: Duration,
    ) -> Result<Authorization, ProviderError> {
        let mut url = self.endpoint(&["v1", "auth", "status"])?;
        url.query_pairs_mut()
            .append_pair("id", id)
            .append_pair("wait", &wait.as_secs().to_string());
        // The server holds the poll for `wait`; the client-wide timeout may be shorter.
        let request = self.client.get(url).timeout(wait + STATUS_POLL_GRACE);
        self.send(request).await
    }

    async fn execute(
        &self,
        tool_name: &str,
        input: Value,
        user_id: &str,
    ) -> Result<ExecutionOutput, ProviderError> {
        let url = self.endpoint(&["v1", "tools", "execute"])?;
        let body = serde_json::json!({
            "tool_name": to_qualified_name(tool_name),
            "input": input,
            "user_id": user_id,
        });
        let execution: WireExecution = self.send(self.client.post(url).json(&body)).await?;

        let (value, error) = execution
            .output
            .map_or((None, None), |out| (out.value, out.error.map(|e| e.message)));
        Ok(ExecutionOutput {
            success: execution.success && error.is_none(),
            value,
            error,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    mod names {
        use super::*;

        #[test]
        fn qualified_to_agent_replaces_first_dot() {
            assert_eq!(
                to_agent_name("PagerdutyApi.ListExistingIncidents"),
                "PagerdutyApi_ListExistingIncidents"
            );
        }

        #[test]
        fn agent_to_qualified_replaces_first_underscore() {
            assert_eq!(to_qualified_name("Gmail_SendEmail"), "Gmail.SendEmail");
            assert_eq!(
                to_qualified_name("GoogleCalendar_Create_Event"),
                "GoogleCalendar.Create_Event"
            );
        }

        #[test]
        fn qualified_names_pass_through() {
            assert_eq!(to_qualified_name("Slack.SendMessage"), "Slack.SendMessage");
        }
    }

    mod schema {
        use super::*;

        fn tool_json() -> Value {
            serde_json::json!({
                "name": "SendEmail",
                "qualified_name": "Gmail.SendEmail",
                "fully_qualified_name": "Gmail.SendEmail@3.0.0",
                "description": "Send an email",
                "toolkit": {"name": "Gmail", "version": "3.0.0"},
                "input": {
                    "parameters": [
                        {
                            "name": "recipient",
                            "required": true,
                            "description": "Address",
                            "value_schema": {"val_type": "string"}
                        },
                        {
                            "name": "cc",
                            "required": false,
                            "value_schema": {"val_type": "array", "inner_val_type": "string"}
                        },
                        {
                            "name": "metadata",
                            "value_schema": {"val_type": "json"}
                        },
                        {
                            "name": "priority",
                            "value_schema": {"val_type": "string", "enum": ["low", "high"]}
                        }
                    ]
                }
            })
        }

        #[test]
        fn wire_tool_converts_to_definition() {
            let wire: WireTool = serde_json::from_value(tool_json()).unwrap();
            let def = ToolDefinition::from(wire);
            assert_eq!(def.name, "Gmail_SendEmail");
            assert_eq!(def.description, "Send an email");

            let props = &def.parameters["properties"];
            assert_eq!(props["recipient"]["type"], "string");
            assert_eq!(props["recipient"]["description"], "Address");
            assert_eq!(props["cc"]["type"], "array");
            assert_eq!(props["cc"]["items"]["type"], "string");
            assert_eq!(props["metadata"]["type"], "object");
            assert_eq!(props["priority"]["enum"][1], "high");
            assert_eq!(def.parameters["required"], serde_json::json!(["recipient"]));
        }

        #[test]
        fn missing_qualified_name_is_built_from_toolkit() {
            let wire: WireTool = serde_json::from_value(serde_json::json!({
                "name": "ListServices",
                "toolkit": {"name": "PagerdutyApi"}
            }))
            .unwrap();
            let def = ToolDefinition::from(wire);
            assert_eq!(def.name, "PagerdutyApi_ListServices");
            assert!(def.parameters["properties"].as_object().unwrap().is_empty());
        }

        #[test]
        fn json_type_mapping() {
            assert_eq!(json_type("integer"), "integer");
            assert_eq!(json_type("number"), "number");
            assert_eq!(json_type("boolean"), "boolean");
            assert_eq!(json_type("json"), "object");
            assert_eq!(json_type("unknown"), "string");
        }
    }

    mod client {
        use super::*;

        #[test]
        fn new_rejects_empty_key() {
            let err = ArcadeClient::new(ArcadeConfig::new("  ")).unwrap_err();
            assert_eq!(err.kind, ProviderErrorKind::Auth);
        }

        #[test]
        fn new_rejects_bad_base_url() {
            let err =
                ArcadeClient::new(ArcadeConfig::new("key").with_base_url("not a url")).unwrap_err();
            assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
        }

        #[test]
        fn endpoint_joins_segments_and_escapes() {
            let client =
                ArcadeClient::new(ArcadeConfig::new("key").with_base_url("http://localhost:9/api/"))
                    .unwrap();
            let url = client.endpoint(&["v1", "tools", "Gmail.SendEmail"]).unwrap();
            assert_eq!(url.as_str(), "http://localhost:9/api/v1/tools/Gmail.SendEmail");
            let url = client.endpoint(&["v1", "tools", "a b"]).unwrap();
            assert!(url.as_str().ends_with("/v1/tools/a%20b"));
        }

        #[test]
        fn config_defaults() {
            let config = ArcadeConfig::new("key").with_timeout(5);
            assert_eq!(config.base_url, ArcadeConfig::DEFAULT_BASE_URL);
            assert_eq!(config.timeout_secs, Some(5));
            assert!(ArcadeConfig::default().api_key.is_empty());
        }

        #[test]
        fn parse_error_maps_status() {
            let err = ArcadeClient::parse_error(401, r#"{"error": "bad key"}"#);
            assert_eq!(err.kind, ProviderErrorKind::Auth);
            assert_eq!(err.message, "bad key");

            let err = ArcadeClient::parse_error(404, "not here");
            assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
            assert_eq!(err.code.as_deref(), Some("404"));
            assert!(err.message.contains("not here"));
        }
    }
}
