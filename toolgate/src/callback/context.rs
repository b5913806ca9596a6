//! Run context shared by the session loop, the tool catalog and the hooks.
//!
//! [`RunContext`] carries the invoking user identity, the [`AgentProfile`]
//! the runtime should play, the current turn and user-defined state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Workflow prompt for the incident-investigation agent.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a Debug Investigation Agent that helps investigate and resolve incidents. When triggered with an incident, follow this workflow:

1. **Retrieve Incident Details**: Use PagerDuty tools to get full incident context, affected services, and existing notes.

2. **Gather Log Data**: Query Datadog logs around the incident timeframe. Search for errors, exceptions, and anomalies. Use RUM events for user impact analysis.

3. **Correlate Issues**: Search for related Datadog incidents, error tracking issues, and events that might explain the root cause.

4. **Analyze Metrics**: Query relevant time series and scalar metrics to understand system behavior during the incident.

5. **Communicate Findings**: Post incident analysis updates to Slack to keep stakeholders informed.

6. **Document Root Cause**: Once investigation is complete, send a root cause analysis summary via Gmail to relevant parties.

7. **Schedule Review**: Create a Google Calendar event for a post-incident review meeting with the team.

Always add investigation notes to the PagerDuty incident and update its status as the investigation progresses.";

/// Default agent name.
pub const DEFAULT_AGENT_NAME: &str = "debug_investigation_agent";

/// Default model identifier, used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Who the agent runtime should be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Agent name reported to hooks and logs.
    pub name: String,
    /// Model identifier forwarded to the runtime.
    pub model: String,
    /// System instructions.
    pub instructions: String,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            instructions: DEFAULT_INSTRUCTIONS.to_owned(),
        }
    }
}

impl AgentProfile {
    /// Create a profile with the default instructions.
    #[must_use]
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Replace the system instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

/// Context passed to the runtime and to every hook during a turn.
///
/// Hooks receive `&RunContext`: they observe, they do not steer.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    user_id: String,
    profile: AgentProfile,
    /// Current turn number (1-indexed once a turn starts, 0 before).
    turn: usize,
    state: HashMap<String, Value>,
}

impl RunContext {
    /// Create a context for a user with the default profile.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Set the agent profile.
    #[must_use]
    pub fn with_profile(mut self, profile: AgentProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the current turn number.
    #[must_use]
    pub const fn with_turn(mut self, turn: usize) -> Self {
        self.turn = turn;
        self
    }

    /// The invoking user identity.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The agent profile.
    #[must_use]
    pub const fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Shorthand for the profile's agent name.
    #[must_use]
    pub fn agent_name(&self) -> &str {
        &self.profile.name
    }

    /// The current turn number.
    #[must_use]
    pub const fn turn(&self) -> usize {
        self.turn
    }

    /// Advance to the next turn.
    pub const fn advance_turn(&mut self) {
        self.turn += 1;
    }

    /// Get a reference to the user-defined state map.
    #[must_use]
    pub const fn state(&self) -> &HashMap<String, Value> {
        &self.state
    }

    /// Get a value from the user-defined state.
    #[must_use]
    pub fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    /// Insert a value into the user-defined state.
    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    /// Remove a value from the user-defined state.
    pub fn remove_state(&mut self, key: &str) -> Option<Value> {
        self.state.remove(key)
    }
}
