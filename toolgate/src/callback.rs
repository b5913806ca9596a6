//! Agent lifecycle callbacks.
//!
//! - [`AgentHooks`]: async observer trait with no-op defaults.
//! - [`LoggingAgentHooks`]: numbered `tracing` lines per event.
//! - [`NoopAgentHooks`]: the default.
//! - [`RunContext`]: what every hook receives.

mod context;
mod hooks;
mod logging;
mod noop;

pub use context::{
    AgentProfile, DEFAULT_AGENT_NAME, DEFAULT_INSTRUCTIONS, DEFAULT_MODEL, RunContext,
};
pub use hooks::{AgentHooks, BoxedAgentHooks, SharedAgentHooks};
pub use logging::{LogLevel, LoggingAgentHooks};
pub use noop::NoopAgentHooks;
