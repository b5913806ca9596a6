//! Agent lifecycle hooks.
//!
//! [`AgentHooks`] uses `async_trait` for object safety and gives every method
//! a no-op default, so implementors only override the events they need.
//!
//! # Lifecycle Events
//!
//! 1. `on_start`: the runtime begins a turn
//! 2. `on_tool_start` / `on_tool_end` around each tool invocation
//! 3. `on_end` with the final output, or `on_error` on failure
//!
//! `on_handoff` is reported when a runtime passes control between agents.

use async_trait::async_trait;

use crate::error::Error;

use super::context::RunContext;

/// A boxed, thread-safe [`AgentHooks`] trait object.
pub type BoxedAgentHooks = Box<dyn AgentHooks>;

/// A shared, thread-safe [`AgentHooks`] trait object.
pub type SharedAgentHooks = std::sync::Arc<dyn AgentHooks>;

/// Lifecycle hooks for an agent run.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    /// Called before the agent begins a turn.
    async fn on_start(&self, _ctx: &RunContext) {}

    /// Called after the agent produces a final output.
    async fn on_end(&self, _ctx: &RunContext, _output: &str) {}

    /// Called immediately before a tool is invoked.
    async fn on_tool_start(&self, _ctx: &RunContext, _tool_name: &str) {}

    /// Called immediately after a tool completes.
    ///
    /// `result` is the tool output rendered as a string, or `Error: ...`.
    async fn on_tool_end(&self, _ctx: &RunContext, _tool_name: &str, _result: &str) {}

    /// Called when control is handed from one agent to another.
    async fn on_handoff(&self, _ctx: &RunContext, _from_agent: &str, _to_agent: &str) {}

    /// Called when the turn fails.
    async fn on_error(&self, _ctx: &RunContext, _error: &Error) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StartOnly {
        starts: AtomicUsize,
    }

    #[async_trait]
    impl AgentHooks for StartOnly {
        async fn on_start(&self, _ctx: &RunContext) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn defaults_are_noops() {
        let hooks = StartOnly::default();
        let ctx = RunContext::new("u");
        hooks.on_end(&ctx, "done").await;
        hooks.on_tool_start(&ctx, "t").await;
        hooks.on_tool_end(&ctx, "t", "ok").await;
        hooks.on_handoff(&ctx, "a", "b").await;
        hooks.on_error(&ctx, &Error::agent("x")).await;
        assert_eq!(hooks.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overridden_method_runs() {
        let hooks = StartOnly::default();
        hooks.on_start(&RunContext::new("u")).await;
        assert_eq!(hooks.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn usable_as_trait_objects() {
        let shared: SharedAgentHooks = Arc::new(StartOnly::default());
        let boxed: BoxedAgentHooks = Box::new(StartOnly::default());
        let ctx = RunContext::new("u");
        shared.on_start(&ctx).await;
        boxed.on_start(&ctx).await;
    }
}
