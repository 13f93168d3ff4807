//! Base provider trait and common types for Aizen
//!
//! This module defines the Provider trait that every model backend must
//! implement, along with the message, tool call, and completion types shared
//! by the assessor, the composer, and the tools.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One entry of the exchange sent to a model
///
/// `role` is one of `system`, `user`, `assistant` or `tool`. An assistant
/// entry carries either text or `tool_calls`; a `tool` entry answers one of
/// those calls through `tool_call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender role
    pub role: String,
    /// Text, absent for pure tool-call turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tools the assistant asked to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Call this tool output answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text_from(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// A user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use aizen::providers::Message;
    ///
    /// let msg = Message::user("What is bushido?");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::text_from("user", content)
    }

    /// An assistant text turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text_from("assistant", content)
    }

    /// The persona or task instructions
    pub fn system(content: impl Into<String>) -> Self {
        Self::text_from("system", content)
    }

    /// Output of a tool, answering `tool_call_id`
    ///
    /// # Examples
    ///
    /// ```
    /// use aizen::providers::Message;
    ///
    /// let msg = Message::tool_result("call_7", "4");
    /// assert_eq!(msg.role, "tool");
    /// assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
    /// ```
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text_from("tool", content)
        }
    }

    /// An assistant turn that only requests tools
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: Some(tool_calls),
            ..Self::text_from("assistant", "")
        }
    }

    /// Trimmed text, `None` when blank
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether this message requests tool execution
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Tool name plus its JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// One of the registered tool names
    pub name: String,
    /// Arguments object, serialized
    pub arguments: String,
}

/// A tool the model asked to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Echoed back in the matching `tool` message
    pub id: String,
    pub function: FunctionCall,
}

/// Token counts reported by the backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Counts with the total filled in
    ///
    /// # Examples
    ///
    /// ```
    /// use aizen::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// The model's reply to one `complete` call
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
    /// Present when the backend reports usage
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// Provider trait for model backends
///
/// All providers (Gemini, Ollama, test fakes) implement this trait. The
/// orchestrator, assessor, composer and model-backed tools receive an
/// `Arc<dyn Provider>` at construction time; there is no global client.
///
/// # Examples
///
/// ```no_run
/// use aizen::providers::{Provider, Message, CompletionResponse};
/// use aizen::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         _tools: &[serde_json::Value],
///     ) -> Result<CompletionResponse> {
///         let last = messages.last().and_then(|m| m.content.clone()).unwrap_or_default();
///         Ok(CompletionResponse::new(Message::assistant(last)))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send `messages` (system prompt first) and offer `tools`
    ///
    /// Tool schemas are objects with `name`, `description` and `parameters`.
    /// An empty slice means the model must answer in text.
    ///
    /// # Errors
    ///
    /// Transport failures, non-success statuses and unparseable bodies.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse>;

    /// Configured model name, when the backend has one
    fn get_current_model(&self) -> Result<String> {
        Err(crate::error::AizenError::Provider(
            "Current model information is not available from this provider".to_string(),
        )
        .into())
    }
}

/// Convenience: a single prompt in, the trimmed text answer out
///
/// Used by the model-backed tools and the haiku/error formatting flows which
/// only need one round trip without tools.
///
/// # Errors
///
/// Propagates provider errors. An empty answer is returned as `Ok(None)`.
pub async fn complete_text(
    provider: &dyn Provider,
    system: Option<&str>,
    prompt: &str,
) -> Result<Option<String>> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));

    let response = provider.complete(&messages, &[]).await?;
    Ok(response.message.text().map(str::to_string))
}

/// Drop tool results that do not answer an earlier assistant call
///
/// Gemini and Ollama both reject a `tool` entry without a matching call
/// before it. Dropped entries are logged.
///
/// # Examples
///
/// ```
/// use aizen::providers::{Message, validate_message_sequence};
///
/// let messages = vec![
///     Message::user("What is 2 + 2?"),
///     Message::tool_result("call_9", "4"),
/// ];
/// assert_eq!(validate_message_sequence(&messages).len(), 1);
/// ```
pub fn validate_message_sequence(messages: &[Message]) -> Vec<Message> {
    let mut issued: HashSet<&str> = HashSet::new();
    let mut kept = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role.as_str() {
            "assistant" => {
                if let Some(calls) = &message.tool_calls {
                    issued.extend(calls.iter().map(|call| call.id.as_str()));
                }
            }
            "tool" => {
                let answers_issued_call = message
                    .tool_call_id
                    .as_deref()
                    .is_some_and(|id| issued.contains(id));
                if !answers_issued_call {
                    tracing::warn!(
                        tool_call_id = ?message.tool_call_id,
                        "Dropping tool result with no matching call"
                    );
                    continue;
                }
            }
            _ => {}
        }
        kept.push(message.clone());
    }

    kept
}
