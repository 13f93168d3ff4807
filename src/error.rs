//! Failure kinds raised inside Aizen
//!
//! Functions return `anyhow`-backed [`Result`]; the typed variants below are
//! what callers downcast to when the kind of failure changes the reply.

use thiserror::Error;

/// Typed failures
///
/// None of these cross the service interface: `AizenService` turns each one
/// into a persona-styled `{error}` reply or a sentinel string.
#[derive(Error, Debug)]
pub enum AizenError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable key for the named provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Transport failure, bad status or unreadable body from a model backend
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Tool execution error: {0}")]
    Tool(String),

    /// The model kept asking for tools after `limit` rounds
    #[error("Tool round limit exceeded: {limit}")]
    ToolRoundsExceeded { limit: usize },

    /// Neither text nor tool calls came back
    #[error("Empty response from provider")]
    EmptyResponse,

    /// SQLite state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Speech error: {0}")]
    Speech(String),

    /// A second message arrived while a turn was still running
    #[error("A turn is already in progress")]
    SessionBusy,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// `anyhow::Result`, so `?` works across crate boundaries
pub type Result<T> = anyhow::Result<T>;
