//! Provider module for Aizen
//!
//! This module contains the model provider abstraction and implementations
//! for Google Gemini and Ollama.

pub mod base;
pub mod gemini;
pub mod ollama;

pub use base::{
    complete_text, validate_message_sequence, CompletionResponse, FunctionCall, Message,
    Provider, TokenUsage, ToolCall,
};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

use crate::config::ProviderConfig;
use crate::error::{AizenError, Result};
use std::sync::Arc;

/// Whether the given provider type needs an API key before any call
///
/// # Examples
///
/// ```
/// use aizen::providers::requires_credential;
///
/// assert!(requires_credential("gemini"));
/// assert!(!requires_credential("ollama"));
/// ```
pub fn requires_credential(provider_type: &str) -> bool {
    provider_type == "gemini"
}

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration; `provider_type` selects the backend
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
/// (including `MissingCredentials` for Gemini without a usable key)
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config.provider_type.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.gemini.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.ollama.clone())?)),
        other => Err(AizenError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
