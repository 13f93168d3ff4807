//! Google Gemini provider implementation for Aizen
//!
//! Talks to the Generative Language REST API (`generateContent`). Aizen's
//! provider-neutral messages are converted into Gemini `contents`: the system
//! prompt becomes `systemInstruction`, assistant turns use the `model` role,
//! tool calls become `functionCall` parts and tool results are sent back as
//! `functionResponse` parts.

use crate::config::GeminiConfig;
use crate::error::{AizenError, Result};
use crate::providers::{CompletionResponse, FunctionCall, Message, Provider, TokenUsage, ToolCall};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Google Gemini API provider
///
/// # Examples
///
/// ```no_run
/// use aizen::config::GeminiConfig;
/// use aizen::providers::{GeminiProvider, Provider, Message};
///
/// # async fn example() -> aizen::error::Result<()> {
/// let config = GeminiConfig {
///     api_key: Some("my-key".to_string()),
///     ..GeminiConfig::default()
/// };
/// let provider = GeminiProvider::new(config)?;
/// let completion = provider.complete(&[Message::user("Hello!")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiToolSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolSet {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Errors
    ///
    /// Returns `AizenError::MissingCredentials` when no usable API key is
    /// configured, or a provider error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !crate::credentials::is_placeholder_key(key))
            .map(|key| key.trim().to_string())
            .ok_or_else(|| AizenError::MissingCredentials("gemini".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("aizen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AizenError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized Gemini provider: model={}", config.model);

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Split out the system instruction and convert the rest into contents
    ///
    /// Consecutive messages that map to the same Gemini role are merged, so
    /// several tool results answering one model turn travel as one content.
    fn convert_messages(&self, messages: &[Message]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let validated = crate::providers::validate_message_sequence(messages);

        let mut system_parts = Vec::new();
        let mut contents: Vec<GeminiContent> = Vec::new();
        let mut call_names: HashMap<String, String> = HashMap::new();

        for message in &validated {
            let (role, parts) = match message.role.as_str() {
                "system" => {
                    if let Some(text) = message.text() {
                        system_parts.push(GeminiPart {
                            text: Some(text.to_string()),
                            ..GeminiPart::default()
                        });
                    }
                    continue;
                }
                "assistant" => {
                    let mut parts = Vec::new();
                    if let Some(text) = message.text() {
                        parts.push(GeminiPart {
                            text: Some(text.to_string()),
                            ..GeminiPart::default()
                        });
                    }
                    for call in message.tool_calls.iter().flatten() {
                        call_names.insert(call.id.clone(), call.function.name.clone());
                        parts.push(GeminiPart {
                            function_call: Some(GeminiFunctionCall {
                                id: Some(call.id.clone()),
                                name: call.function.name.clone(),
                                args: serde_json::from_str(&call.function.arguments)
                                    .unwrap_or_else(|_| serde_json::json!({})),
                            }),
                            ..GeminiPart::default()
                        });
                    }
                    ("model", parts)
                }
                "tool" => {
                    let id = message.tool_call_id.clone().unwrap_or_default();
                    let name = call_names.get(&id).cloned().unwrap_or_default();
                    let part = GeminiPart {
                        function_response: Some(GeminiFunctionResponse {
                            id: Some(id),
                            name,
                            response: serde_json::json!({
                                "content": message.content.clone().unwrap_or_default()
                            }),
                        }),
                        ..GeminiPart::default()
                    };
                    ("user", vec![part])
                }
                _ => {
                    let parts = message
                        .text()
                        .map(|text| {
                            vec![GeminiPart {
                                text: Some(text.to_string()),
                                ..GeminiPart::default()
                            }]
                        })
                        .unwrap_or_default();
                    ("user", parts)
                }
            };

            if parts.is_empty() {
                continue;
            }

            match contents.last_mut() {
                Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
                _ => contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts,
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        (system, contents)
    }

    fn convert_tools(&self, tools: &[serde_json::Value]) -> Vec<GeminiToolSet> {
        let declarations: Vec<GeminiFunctionDeclaration> = tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                Some(GeminiFunctionDeclaration {
                    name: obj.get("name")?.as_str()?.to_string(),
                    description: obj.get("description")?.as_str()?.to_string(),
                    parameters: obj.get("parameters")?.clone(),
                })
            })
            .collect();

        if declarations.is_empty() {
            Vec::new()
        } else {
            vec![GeminiToolSet {
                function_declarations: declarations,
            }]
        }
    }

    fn convert_response(&self, response: GenerateContentResponse) -> Result<CompletionResponse> {
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            tracing::error!("Gemini returned no candidates");
            AizenError::Provider("Gemini returned no candidates".to_string())
        })?;

        if let Some(reason) = &candidate.finish_reason {
            tracing::debug!("Gemini finish reason: {}", reason);
        }

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    id: call
                        .id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                    function: FunctionCall {
                        name: call.name,
                        arguments: serde_json::to_string(&call.args)
                            .unwrap_or_else(|_| "{}".to_string()),
                    },
                });
            }
        }

        let message = if tool_calls.is_empty() {
            Message::assistant(text)
        } else {
            let mut message = Message::assistant_with_tools(tool_calls);
            if !text.trim().is_empty() {
                message.content = Some(text);
            }
            message
        };

        Ok(match response.usage_metadata {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.prompt_token_count, usage.candidates_token_count),
            ),
            None => CompletionResponse::new(message),
        })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let (system_instruction, contents) = self.convert_messages(messages);
        let request = GenerateContentRequest {
            contents,
            system_instruction,
            tools: self.convert_tools(tools),
        };

        tracing::debug!(
            "Sending Gemini request: {} contents, {} tool sets",
            request.contents.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {}", e);
                AizenError::Provider(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(AizenError::Provider(format!(
                "Gemini returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            AizenError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        self.convert_response(body)
    }

    fn get_current_model(&self) -> Result<String> {
        Ok(self.config.model.clone())
    }
}
