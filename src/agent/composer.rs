//! Response composer
//!
//! Produces one response string for the composed-answer branch: the persona
//! prompt, the bounded history and the user message go to the provider
//! together with the tool definitions, and tool calls are executed until the
//! model answers in text.
//!
//! At most one search runs per turn. A second search request receives a
//! refusal as its tool result instead of being executed.

use crate::agent::conversation::HistoryMessage;
use crate::error::{AizenError, Result};
use crate::preferences::UserPreferences;
use crate::prompts::build_system_prompt;
use crate::providers::{Message, Provider, ToolCall};
use crate::tools::{ToolRegistry, SEARCH_TOOL};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool result sent back when the model asks for a second search
pub const SEARCH_LIMIT_NOTICE: &str = "Only one internet search is permitted per turn and it \
has already been used. Answer with the information you already have.";

/// Runs the persona prompt and tool loop for one turn
pub struct ResponseComposer {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    max_tool_rounds: usize,
}

impl ResponseComposer {
    /// Create a composer
    ///
    /// # Arguments
    ///
    /// * `provider` - Model backend
    /// * `tools` - Tools offered to the model
    /// * `max_tool_rounds` - Rounds of tool calls allowed before a final answer is demanded
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, max_tool_rounds: usize) -> Self {
        Self {
            provider,
            tools,
            max_tool_rounds,
        }
    }

    /// Compose a single response
    ///
    /// After `max_tool_rounds` rounds of tool calls the provider is called
    /// once more without tools to force a text answer.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, `AizenError::EmptyResponse` when the
    /// model answers with nothing, or `AizenError::ToolRoundsExceeded` when it
    /// keeps requesting tools.
    pub async fn compose(
        &self,
        message: &str,
        history: &[HistoryMessage],
        preferences: Option<UserPreferences>,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(build_system_prompt(preferences)));
        messages.extend(history.iter().filter_map(|entry| match entry.role.as_str() {
            "user" => Some(Message::user(entry.content.clone())),
            "assistant" => Some(Message::assistant(entry.content.clone())),
            _ => None,
        }));
        messages.push(Message::user(message));

        let definitions = self.tools.all_definitions();
        let mut searches_used = 0usize;

        for round in 0..=self.max_tool_rounds {
            let offered: &[serde_json::Value] = if round < self.max_tool_rounds {
                &definitions
            } else {
                &[]
            };

            debug!(
                "Composer round {}/{}: {} messages",
                round + 1,
                self.max_tool_rounds + 1,
                messages.len()
            );
            let response = self.provider.complete(&messages, offered).await?;
            let reply = response.message;

            if !reply.has_tool_calls() {
                return reply
                    .text()
                    .map(str::to_string)
                    .ok_or_else(|| AizenError::EmptyResponse.into());
            }

            if offered.is_empty() {
                warn!("Model requested tools after the round limit");
                break;
            }

            let calls: Vec<ToolCall> = reply.tool_calls.clone().unwrap_or_default();
            messages.push(reply);

            for call in &calls {
                let content = self.run_tool_call(call, &mut searches_used).await;
                messages.push(Message::tool_result(call.id.clone(), content));
            }
        }

        Err(AizenError::ToolRoundsExceeded {
            limit: self.max_tool_rounds,
        }
        .into())
    }

    async fn run_tool_call(&self, call: &ToolCall, searches_used: &mut usize) -> String {
        let name = call.function.name.as_str();

        if name == SEARCH_TOOL {
            if *searches_used >= 1 {
                warn!("Refusing additional search in the same turn");
                return SEARCH_LIMIT_NOTICE.to_string();
            }
            *searches_used += 1;
        }

        let args = serde_json::from_str::<serde_json::Value>(&call.function.arguments)
            .unwrap_or_else(|e| {
                warn!(tool = name, "Unparseable tool arguments: {}", e);
                serde_json::json!({})
            });

        match self.tools.execute_rendered(name, args).await {
            Ok(content) => content,
            Err(e) => {
                warn!("{}", e);
                format!("The tool '{}' is not available.", name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedProvider;
    use crate::tools::search::SEARCH_SENTINELS;
    use crate::tools::ToolRegistryBuilder;

    fn composer(provider: Arc<ScriptedProvider>, rounds: usize) -> ResponseComposer {
        let tools = Arc::new(ToolRegistryBuilder::new(provider.clone()).build());
        ResponseComposer::new(provider, tools, rounds)
    }

    #[tokio::test]
    async fn test_direct_answer_single_call() {
        let provider = Arc::new(ScriptedProvider::new().then_text("Paris."));
        let history = vec![
            HistoryMessage::new("user", "Hello"),
            HistoryMessage::new("assistant", "Greetings."),
            HistoryMessage::new("error", "ignored"),
        ];
        let answer = composer(provider.clone(), 4)
            .compose("Capital of France?", &history, None)
            .await
            .unwrap();
        assert_eq!(answer, "Paris.");

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        let roles: Vec<&str> = sent[0].messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(sent[0].tools.len(), 3);
    }

    #[tokio::test]
    async fn test_calculator_round_trip() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("calculate", r#"{"expression":"2+2"}"#)
                .then_text("Two and two make 4."),
        );
        let answer = composer(provider.clone(), 4)
            .compose("What is 2+2?", &[], None)
            .await
            .unwrap();
        assert!(answer.contains('4'));

        let sent = provider.requests();
        let tool_msg = sent[1].messages.last().unwrap();
        assert_eq!(tool_msg.role, "tool");
        assert_eq!(tool_msg.content.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_second_search_is_refused() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_calls(&[
                    ("internet_search", r#"{"query":"a"}"#),
                    ("internet_search", r#"{"query":"b"}"#),
                ])
                .then_text("Answer for a.")
                .then_text("Final."),
        );
        let answer = composer(provider.clone(), 4)
            .compose("two things", &[], None)
            .await
            .unwrap();
        assert_eq!(answer, "Final.");

        let sent = provider.requests();
        // composer call, one search call, then the follow-up composer call
        assert_eq!(sent.len(), 3);
        let tool_messages: Vec<&Message> = sent[2]
            .messages
            .iter()
            .filter(|m| m.role == "tool")
            .collect();
        assert_eq!(tool_messages.len(), 2);
        assert_eq!(tool_messages[0].content.as_deref(), Some("Answer for a."));
        assert_eq!(tool_messages[1].content.as_deref(), Some(SEARCH_LIMIT_NOTICE));
    }

    #[tokio::test]
    async fn test_search_failure_reaches_model_as_sentinel() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("internet_search", r#"{"query":"x"}"#)
                .then_fail("search backend down")
                .then_text("I could not find that."),
        );
        composer(provider.clone(), 4)
            .compose("x?", &[], None)
            .await
            .unwrap();
        let sent = provider.requests();
        let tool_msg = sent[2].messages.last().unwrap();
        assert_eq!(tool_msg.content.as_deref(), Some(SEARCH_SENTINELS.error));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("launch_rockets", "{}")
                .then_text("I cannot do that."),
        );
        let answer = composer(provider.clone(), 4).compose("go", &[], None).await.unwrap();
        assert_eq!(answer, "I cannot do that.");
        let sent = provider.requests();
        assert!(sent[1]
            .messages
            .last()
            .unwrap()
            .content
            .as_deref()
            .unwrap()
            .contains("not available"));
    }

    #[tokio::test]
    async fn test_final_round_offers_no_tools() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("get_time", "{}")
                .then_text("It is late."),
        );
        composer(provider.clone(), 1)
            .compose("time?", &[], None)
            .await
            .unwrap();
        let sent = provider.requests();
        assert_eq!(sent[0].tools.len(), 3);
        assert!(sent[1].tools.is_empty());
    }

    #[tokio::test]
    async fn test_round_limit_exceeded() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then_tool_call("get_time", "{}")
                .then_tool_call("get_time", "{}"),
        );
        let err = composer(provider, 1).compose("loop", &[], None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AizenError>(),
            Some(AizenError::ToolRoundsExceeded { limit: 1 })
        ));
    }

    #[tokio::test]
    async fn test_empty_answer_is_error() {
        let provider = Arc::new(ScriptedProvider::new().then_text("   "));
        let err = composer(provider, 4).compose("hi", &[], None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AizenError>(),
            Some(AizenError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new().then_fail("boom"));
        assert!(composer(provider, 4).compose("hi", &[], None).await.is_err());
    }
}
