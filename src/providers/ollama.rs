//! Local backend speaking Ollama's `/api/chat`
//!
//! No credential is involved, so this is how Aizen runs fully offline.
//! Ollama takes tool arguments as JSON objects and usually omits call ids;
//! both differences are absorbed here.

use crate::config::OllamaConfig;
use crate::error::{AizenError, Result};
use crate::providers::{
    validate_message_sequence, CompletionResponse, FunctionCall, Message, Provider, TokenUsage,
    ToolCall,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Provider backed by an Ollama server
///
/// ```no_run
/// use aizen::config::OllamaConfig;
/// use aizen::providers::{Message, OllamaProvider, Provider};
///
/// # async fn example() -> aizen::error::Result<()> {
/// let ollama = OllamaProvider::new(OllamaConfig::default())?;
/// let reply = ollama.complete(&[Message::user("Speak of patience")], &[]).await?;
/// println!("{:?}", reply.message.content);
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    http: Client,
    endpoint: String,
    settings: OllamaConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireCall>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireToolSpec,
}

#[derive(Debug, Serialize)]
struct WireToolSpec {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCall {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    function: WireCallBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCallBody {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: WireMessage,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
}

impl From<&ToolCall> for WireCall {
    fn from(call: &ToolCall) -> Self {
        let arguments = serde_json::from_str(&call.function.arguments)
            .unwrap_or_else(|_| Value::Object(Default::default()));
        WireCall {
            id: call.id.clone(),
            function: WireCallBody {
                name: call.function.name.clone(),
                arguments,
            },
        }
    }
}

impl From<WireCall> for ToolCall {
    fn from(call: WireCall) -> Self {
        let id = if call.id.is_empty() {
            format!("call_{}", uuid::Uuid::new_v4().simple())
        } else {
            call.id
        };
        let arguments = match call.function.arguments {
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        ToolCall {
            id,
            function: FunctionCall {
                name: call.function.name,
                arguments,
            },
        }
    }
}

/// Outgoing history; messages with neither text nor calls are skipped
fn to_wire(messages: &[Message]) -> Vec<WireMessage> {
    let mut out = Vec::with_capacity(messages.len());
    for msg in validate_message_sequence(messages) {
        if msg.content.is_none() && msg.tool_calls.is_none() {
            continue;
        }
        out.push(WireMessage {
            role: msg.role.clone(),
            content: msg.content.clone().unwrap_or_default(),
            tool_calls: msg
                .tool_calls
                .iter()
                .flatten()
                .map(WireCall::from)
                .collect(),
        });
    }
    out
}

/// Schemas lacking a name, description or parameters are dropped
fn tool_specs(tools: &[Value]) -> Vec<WireTool> {
    tools
        .iter()
        .filter_map(|schema| {
            let name = schema.get("name")?.as_str()?;
            let description = schema.get("description")?.as_str()?;
            let parameters = schema.get("parameters")?;
            Some(WireTool {
                r#type: "function",
                function: WireToolSpec {
                    name: name.to_string(),
                    description: description.to_string(),
                    parameters: parameters.clone(),
                },
            })
        })
        .collect()
}

fn from_wire(reply: WireMessage) -> Message {
    if reply.tool_calls.is_empty() {
        Message::assistant(reply.content)
    } else {
        Message::assistant_with_tools(reply.tool_calls.into_iter().map(ToolCall::from).collect())
    }
}

impl OllamaProvider {
    /// Build the HTTP client for `config.host`
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be constructed.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("aizen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AizenError::Provider(format!("Failed to create HTTP client: {}", e)))?;
        let endpoint = format!("{}/api/chat", config.host.trim_end_matches('/'));

        tracing::info!(host = %config.host, model = %config.model, "Ollama provider ready");

        Ok(Self {
            http,
            endpoint,
            settings: config,
        })
    }

    pub fn host(&self) -> &str {
        &self.settings.host
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(&self, messages: &[Message], tools: &[Value]) -> Result<CompletionResponse> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: to_wire(messages),
            tools: tool_specs(tools),
            stream: false,
        };
        tracing::debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling Ollama"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Ollama unreachable: {}", e);
                AizenError::Provider(format!("Ollama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Ollama rejected the request");
            return Err(
                AizenError::Provider(format!("Ollama returned error {}: {}", status, body)).into(),
            );
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            AizenError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        let usage = (reply.prompt_eval_count + reply.eval_count > 0)
            .then(|| TokenUsage::new(reply.prompt_eval_count, reply.eval_count));
        let message = from_wire(reply.message);

        Ok(match usage {
            Some(usage) => CompletionResponse::with_usage(message, usage),
            None => CompletionResponse::new(message),
        })
    }

    fn get_current_model(&self) -> Result<String> {
        Ok(self.settings.model.clone())
    }
}
