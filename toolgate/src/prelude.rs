//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use toolgate::prelude::*;
//! ```

pub use crate::auth::{
    Authorization, AuthorizationListener, AuthorizationStatus, LoggingAuthListener,
    SharedAuthorizationListener,
};
pub use crate::callback::{
    AgentHooks, AgentProfile, BoxedAgentHooks, LogLevel, LoggingAgentHooks, NoopAgentHooks,
    RunContext, SharedAgentHooks,
};
pub use crate::confirm::{
    AlwaysDenyHandler, AutoApproveHandler, BoxedConfirmationHandler, ConfirmationDecision,
    ConfirmationHandler, ConsoleConfirmation, SharedConfirmationHandler, SharedLineReader,
    ToolConfirmationRequest, shared_stdin,
};
pub use crate::error::{Error, ProviderError, ProviderErrorKind, Result, ToolError};
pub use crate::gate::{ConfirmedTool, GateConfig, ToolGate, wrap_with_confirmation};
pub use crate::message::{Message, Role};
pub use crate::provider::{
    ArcadeClient, ArcadeConfig, ExecutionOutput, RemoteTool, SharedToolProvider, ToolProvider,
    ToolQuery, catalog,
};
pub use crate::session::{AgentRuntime, RunOutput, Session, SharedAgentRuntime, TurnOutcome};
pub use crate::tool::{
    BoxedTool, FnTool, SharedTool, Tool, ToolBox, ToolDefinition, ToolExecutionPolicy, ToolResult,
};
