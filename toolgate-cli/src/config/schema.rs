//! Configuration schema definitions.
//!
//! Every section has serde defaults, so a partial file (or none at all)
//! yields a usable configuration once the environment supplies the
//! credentials.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toolgate::callback::{AgentProfile, DEFAULT_AGENT_NAME, DEFAULT_INSTRUCTIONS, DEFAULT_MODEL};
use toolgate::gate::{DEFAULT_AUTH_WAIT, GateConfig};
use toolgate::provider::{ArcadeConfig, DEFAULT_TOOL_LIMIT, ToolQuery};

use super::{ConfigError, ConfigResult};

/// Tools fetched by name for the incident investigation workflow.
const DEFAULT_TOOLS: &[&str] = &[
    "PagerdutyApi_ListExistingIncidents",
    "PagerdutyApi_GetIncidentDetails",
    "PagerdutyApi_ListIncidentLogEntries",
    "PagerdutyApi_ListIncidentAlerts",
    "PagerdutyApi_ListIncidentNotes",
    "PagerdutyApi_AddIncidentNote",
    "PagerdutyApi_UpdateIncidentStatus",
    "PagerdutyApi_GetServiceDetails",
    "PagerdutyApi_ListServices",
    "DatadogApi_ListLogs",
    "DatadogApi_ListLogsMatchingQuery",
    "DatadogApi_SearchDatadogEvents",
    "DatadogApi_GetEventDetails",
    "DatadogApi_SearchDatadogIncidents",
    "DatadogApi_GetIncidentDetails",
    "DatadogApi_SearchDatadogIssues",
    "DatadogApi_GetErrorTrackingIssueDetails",
    "DatadogApi_SearchRumEvents",
    "DatadogApi_ListRumEvents",
    "DatadogApi_QueryTimeseriesData",
    "DatadogApi_QueryScalarData",
];

const DEFAULT_TOOLKITS: &[&str] = &["Slack", "Gmail", "GoogleCalendar"];

/// Tools with side effects visible to other people.
const DEFAULT_CONFIRM: &[&str] = &[
    "PagerdutyApi_AddIncidentNote",
    "PagerdutyApi_UpdateIncidentStatus",
    "Slack_SendMessage",
    "Gmail_SendEmail",
    "GoogleCalendar_CreateEvent",
];

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|&name| name.to_owned()).collect()
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolgateConfig {
    /// Arcade connection.
    #[serde(default)]
    pub arcade: ArcadeSection,

    /// Agent profile handed to the runtime.
    #[serde(default)]
    pub agent: AgentSection,

    /// Which tools to load.
    #[serde(default)]
    pub catalog: CatalogSection,

    /// Confirmation and authorization policy.
    #[serde(default)]
    pub gate: GateSection,
}

/// Arcade connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcadeSection {
    /// API key; usually supplied through `ARCADE_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    ArcadeConfig::DEFAULT_BASE_URL.to_owned()
}

const fn default_timeout_secs() -> u64 {
    ArcadeConfig::DEFAULT_TIMEOUT_SECS
}

impl Default for ArcadeSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Agent profile settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSection {
    /// Agent name.
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Instructions override; the built-in investigation prompt when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_owned()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            model: default_model(),
            instructions: None,
        }
    }
}

/// Tool catalog settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSection {
    /// Tools fetched by name.
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,
    /// Toolkits fetched whole.
    #[serde(default = "default_toolkits")]
    pub toolkits: Vec<String>,
    /// Maximum tools per toolkit.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_tools() -> Vec<String> {
    owned(DEFAULT_TOOLS)
}

fn default_toolkits() -> Vec<String> {
    owned(DEFAULT_TOOLKITS)
}

const fn default_limit() -> usize {
    DEFAULT_TOOL_LIMIT
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            tools: default_tools(),
            toolkits: default_toolkits(),
            limit: default_limit(),
        }
    }
}

/// Gate policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSection {
    /// User the tools are authorized and executed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Tools that need a human yes before every call.
    #[serde(default = "default_confirm")]
    pub require_confirmation: Vec<String>,
    /// Tools never exposed.
    #[serde(default)]
    pub forbidden: Vec<String>,
    /// Seconds each authorization status poll may wait server-side.
    #[serde(default = "default_auth_wait_secs")]
    pub auth_wait_secs: u64,
}

fn default_confirm() -> Vec<String> {
    owned(DEFAULT_CONFIRM)
}

/// Longest status long-poll Arcade honours.
const MAX_AUTH_WAIT_SECS: u64 = 59;

const fn default_auth_wait_secs() -> u64 {
    DEFAULT_AUTH_WAIT.as_secs()
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            user_id: None,
            require_confirmation: default_confirm(),
            forbidden: Vec::new(),
            auth_wait_secs: default_auth_wait_secs(),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl ToolgateConfig {
    /// Validate the configuration and return any issues found.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if non_empty(self.arcade.api_key.as_ref()).is_none() {
            issues.push(ConfigIssue::error(
                "arcade.api_key",
                "No Arcade API key. Set ARCADE_API_KEY or arcade.api_key.",
            ));
        }
        if url::Url::parse(&self.arcade.base_url).is_err() {
            issues.push(ConfigIssue::error(
                "arcade.base_url",
                format!("'{}' is not a valid URL", self.arcade.base_url),
            ));
        }
        if non_empty(self.gate.user_id.as_ref()).is_none() {
            issues.push(ConfigIssue::error(
                "gate.user_id",
                "No user id. Set ARCADE_USER_ID or gate.user_id.",
            ));
        }
        if self.agent.model.trim().is_empty() {
            issues.push(ConfigIssue::error("agent.model", "Model must not be empty"));
        }
        if self.catalog.tools.is_empty() && self.catalog.toolkits.is_empty() {
            issues.push(ConfigIssue::warning(
                "catalog",
                "No tools or toolkits configured, the agent will have no tools",
            ));
        }
        if self.catalog.limit == 0 {
            issues.push(ConfigIssue::warning(
                "catalog.limit",
                "Limit is 0, toolkits will contribute no tools",
            ));
        }
        for name in &self.gate.require_confirmation {
            if self.gate.forbidden.contains(name) {
                issues.push(ConfigIssue::warning(
                    "gate.forbidden",
                    format!("{name} is both forbidden and confirmed; forbidden wins"),
                ));
            }
        }
        if self.gate.auth_wait_secs == 0 {
            issues.push(ConfigIssue::warning(
                "gate.auth_wait_secs",
                "Authorization polling will not wait between requests",
            ));
        }
        if self.gate.auth_wait_secs > MAX_AUTH_WAIT_SECS {
            issues.push(ConfigIssue::warning(
                "gate.auth_wait_secs",
                format!("Arcade caps each status poll at {MAX_AUTH_WAIT_SECS}s"),
            ));
        }

        issues
    }

    /// Check if the configuration is valid (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate()
            .iter()
            .all(|issue| issue.level != IssueLevel::Error)
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; non-empty values replace the file's.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ARCADE_API_KEY") {
            self.arcade.api_key = Some(key);
        }
        if let Some(url) = get("ARCADE_BASE_URL") {
            self.arcade.base_url = url;
        }
        if let Some(user) = get("ARCADE_USER_ID") {
            self.gate.user_id = Some(user);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.agent.model = model;
        }
        self
    }

    /// The user id, if configured.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        non_empty(self.gate.user_id.as_ref())
    }

    /// Build the Arcade client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] without an API key.
    pub fn arcade_config(&self) -> ConfigResult<ArcadeConfig> {
        let key = non_empty(self.arcade.api_key.as_ref())
            .ok_or_else(|| ConfigError::MissingField("arcade.api_key".to_owned()))?;
        Ok(ArcadeConfig::new(key)
            .with_base_url(&self.arcade.base_url)
            .with_timeout(self.arcade.timeout_secs))
    }

    /// Build the gate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] without a user id.
    pub fn gate_config(&self) -> ConfigResult<GateConfig> {
        let user = self
            .user_id()
            .ok_or_else(|| ConfigError::MissingField("gate.user_id".to_owned()))?;
        Ok(GateConfig::new(user)
            .require_confirmation(&self.gate.require_confirmation)
            .forbid(&self.gate.forbidden)
            .with_auth_wait(Duration::from_secs(self.gate.auth_wait_secs)))
    }

    /// The catalog query.
    #[must_use]
    pub fn tool_query(&self) -> ToolQuery {
        ToolQuery::new()
            .with_tools(&self.catalog.tools)
            .with_toolkits(&self.catalog.toolkits)
            .with_limit(self.catalog.limit)
    }

    /// The agent profile.
    #[must_use]
    pub fn agent_profile(&self) -> AgentProfile {
        AgentProfile::new(&self.agent.name, &self.agent.model).with_instructions(
            self.agent
                .instructions
                .as_deref()
                .unwrap_or(DEFAULT_INSTRUCTIONS),
        )
    }
}

/// Configuration validation issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Issue severity level.
    pub level: IssueLevel,
    /// Configuration path (e.g., "gate.user_id").
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl ConfigIssue {
    /// Create an error-level issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a warning-level issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.level {
            IssueLevel::Error => "ERROR",
            IssueLevel::Warning => "WARN",
        };
        write!(f, "[{prefix}] {}: {}", self.path, self.message)
    }
}

/// Severity level for configuration issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    /// The gate cannot start.
    Error,
    /// Suspicious but usable.
    Warning,
}
