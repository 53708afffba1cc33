/// Error Types
///
/// Registration and invocation failures are local validation errors surfaced
/// synchronously to the caller. Nothing here is retried.

use thiserror::Error;

/// Errors returned while registering a tool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A tool with this name exists and the registry rejects duplicates.
    #[error("tool already registered: {0}")]
    DuplicateName(String),

    /// A declared parameter type has no primitive mapping.
    #[error("tool '{tool}': parameter '{param}' has unsupported type '{declared}'")]
    UnsupportedSignature {
        tool: String,
        param: String,
        declared: String,
    },
}

/// Errors returned while invoking a tool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool '{tool}': {reason}")]
    ArgumentMismatch { tool: String, reason: String },

    /// Raised by the handler itself; the message is passed through untouched.
    #[error("{0}")]
    Handler(String),
}

/// Invalid configuration values read from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}
