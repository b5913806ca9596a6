//! Toolgate - authorization and human confirmation for agent tool calls
//!
//! This crate sits between an agent runtime and a managed tool provider. It
//! makes sure each tool is authorized for the invoking user before first
//! use, asks a human before every call to a sensitive tool, and turns a
//! declined call into a recoverable conversation turn.

pub mod auth;
pub mod callback;
pub mod confirm;
pub mod error;
pub mod gate;
pub mod message;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod tool;

pub use error::{Error, ProviderError, Result, ToolError};
