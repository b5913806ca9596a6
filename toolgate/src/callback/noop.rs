//! No-op hooks, the default when nothing is configured.

use async_trait::async_trait;

use super::hooks::AgentHooks;

/// An [`AgentHooks`] implementation that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAgentHooks;

#[async_trait]
impl AgentHooks for NoopAgentHooks {}
