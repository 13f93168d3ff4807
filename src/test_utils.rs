//! Test utilities for Aizen
//!
//! Provides a scripted `Provider` fake so the assessor, composer, tools and
//! service can be exercised without a network, plus small config helpers.

use crate::config::Config;
use crate::error::{AizenError, Result};
use crate::providers::{CompletionResponse, FunctionCall, Message, Provider, ToolCall};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted provider reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Plain assistant text
    Text(String),
    /// Assistant requests these tool calls: `(name, json arguments)`
    ToolCalls(Vec<(String, String)>),
    /// Provider failure with this message
    Fail(String),
}

/// A request the fake received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Messages sent to the provider
    pub messages: Vec<Message>,
    /// Tool schemas sent to the provider
    pub tools: Vec<serde_json::Value>,
}

/// Provider fake that replays scripted replies in order
///
/// Once the script is exhausted every further call fails, which makes
/// "no model call happened" assertions straightforward via `requests()`.
///
/// # Examples
///
/// ```ignore
/// let provider = ScriptedProvider::new()
///     .then_tool_call("calculate", r#"{"expression":"2+2"}"#)
///     .then_text("The answer is 4.");
/// ```
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(text.into()))
    }

    /// Queue a single tool call reply
    pub fn then_tool_call(self, name: &str, arguments: &str) -> Self {
        self.push(ScriptedReply::ToolCalls(vec![(
            name.to_string(),
            arguments.to_string(),
        )]))
    }

    /// Queue a reply with several tool calls
    pub fn then_tool_calls(self, calls: &[(&str, &str)]) -> Self {
        self.push(ScriptedReply::ToolCalls(
            calls
                .iter()
                .map(|(n, a)| (n.to_string(), a.to_string()))
                .collect(),
        ))
    }

    /// Queue a provider failure
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Fail(message.into()))
    }

    fn push(self, reply: ScriptedReply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tools: tools.to_vec(),
            });
            requests.len()
        };

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(ScriptedReply::Text(text)) => {
                Ok(CompletionResponse::new(Message::assistant(text)))
            }
            Some(ScriptedReply::ToolCalls(calls)) => {
                let calls = calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, arguments))| ToolCall {
                        id: format!("call_{}_{}", index, i),
                        function: FunctionCall { name, arguments },
                    })
                    .collect();
                Ok(CompletionResponse::new(Message::assistant_with_tools(
                    calls,
                )))
            }
            Some(ScriptedReply::Fail(message)) => Err(AizenError::Provider(message).into()),
            None => Err(AizenError::Provider("script exhausted".to_string()).into()),
        }
    }
}

/// Create a test configuration with a usable Gemini key
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.provider.gemini.api_key = Some("test-key".to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new()
            .then_tool_call("get_time", "{}")
            .then_text("done");

        let first = provider.complete(&[Message::user("a")], &[]).await.unwrap();
        assert!(first.message.has_tool_calls());
        let second = provider.complete(&[Message::user("b")], &[]).await.unwrap();
        assert_eq!(second.message.content.as_deref(), Some("done"));
        assert!(provider.complete(&[], &[]).await.is_err());
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_test_config_has_key() {
        assert_eq!(
            test_config().provider.gemini.api_key.as_deref(),
            Some("test-key")
        );
    }
}
