//! Tracing-based logging implementation of [`AgentHooks`].
//!
//! [`LoggingAgentHooks`] numbers every event it sees and emits it as
//! `### (<display name>) <n>: <what happened>`.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::Error;

use super::context::RunContext;
use super::hooks::AgentHooks;

/// Log verbosity level for hook events.
///
/// Maps directly to `tracing` levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace-level logging (most verbose).
    Trace,
    /// Debug-level logging.
    Debug,
    /// Info-level logging (default).
    #[default]
    Info,
    /// Warn-level logging.
    Warn,
}

/// Emit a log event at the specified level using `tracing` macros.
macro_rules! log_at_level {
    ($level:expr, $($arg:tt)*) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)*),
            LogLevel::Debug => tracing::debug!($($arg)*),
            LogLevel::Info  => tracing::info!($($arg)*),
            LogLevel::Warn  => tracing::warn!($($arg)*),
        }
    };
}

/// An [`AgentHooks`] implementation that logs a numbered line per event.
///
/// # Example
///
/// ```rust
/// use toolgate::callback::{LogLevel, LoggingAgentHooks};
///
/// let hooks = LoggingAgentHooks::new("triage").with_level(LogLevel::Debug);
/// assert_eq!(hooks.event_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct LoggingAgentHooks {
    display_name: String,
    level: LogLevel,
    events: AtomicUsize,
}

impl LoggingAgentHooks {
    /// Create logging hooks labelled with `display_name`, logging at INFO.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Set the log level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// The label printed in every line.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Number of events seen so far.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }

    fn next_event(&self) -> usize {
        self.events.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl AgentHooks for LoggingAgentHooks {
    async fn on_start(&self, ctx: &RunContext) {
        let n = self.next_event();
        log_at_level!(
            self.level,
            turn = ctx.turn(),
            "### ({}) {n}: Agent {} started",
            self.display_name,
            ctx.agent_name()
        );
    }

    async fn on_end(&self, ctx: &RunContext, output: &str) {
        let n = self.next_event();
        log_at_level!(
            self.level,
            turn = ctx.turn(),
            output_len = output.len(),
            "### ({}) {n}: Agent {} ended",
            self.display_name,
            ctx.agent_name()
        );
    }

    async fn on_tool_start(&self, ctx: &RunContext, tool_name: &str) {
        let n = self.next_event();
        log_at_level!(
            self.level,
            turn = ctx.turn(),
            user = ctx.user_id(),
            "### ({}) {n}: Agent {} started tool {tool_name}",
            self.display_name,
            ctx.agent_name()
        );
    }

    async fn on_tool_end(&self, ctx: &RunContext, tool_name: &str, result: &str) {
        let n = self.next_event();
        log_at_level!(
            self.level,
            turn = ctx.turn(),
            result_len = result.len(),
            "### ({}) {n}: Agent {} ended tool {tool_name}",
            self.display_name,
            ctx.agent_name()
        );
    }

    async fn on_handoff(&self, ctx: &RunContext, from_agent: &str, to_agent: &str) {
        let n = self.next_event();
        log_at_level!(
            self.level,
            turn = ctx.turn(),
            "### ({}) {n}: Agent {from_agent} handed off to {to_agent}",
            self.display_name
        );
    }

    async fn on_error(&self, ctx: &RunContext, error: &Error) {
        let n = self.next_event();
        // Errors always log at WARN regardless of configured level.
        tracing::warn!(
            turn = ctx.turn(),
            error = %error,
            "### ({}) {n}: Agent {} failed",
            self.display_name,
            ctx.agent_name()
        );
    }
}
