//! Service interface
//!
//! `AizenService` is the boundary the session and the CLI talk to. It owns
//! the credential check and turns every failure into a persona-styled reply,
//! so no error crosses it.

use crate::agent::assessor::{CapabilityAssessor, ModelAssessor};
use crate::agent::composer::ResponseComposer;
use crate::agent::conversation::HistoryMessage;
use crate::agent::orchestrator::TurnOrchestrator;
use crate::config::Config;
use crate::credentials::{has_usable_credential, is_credential_error, API_KEY_ERROR_MESSAGE};
use crate::error::{AizenError, Result};
use crate::preferences::UserPreferences;
use crate::prompts::{error_format_prompt, haiku_prompt};
use crate::providers::{complete_text, create_provider, Provider};
use crate::tools::ToolRegistryBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reply when a turn fails and the failure cannot be phrased by the model
pub const GENERIC_ERROR_MESSAGE: &str = "Aizen is currently unable to process this request due \
to an internal disturbance. Please try again later.";

/// Reply when a haiku fails and the failure cannot be phrased by the model
pub const HAIKU_ERROR_MESSAGE: &str =
    "The path to poetry is sometimes clouded. A disturbance occurred. Please try again.";

/// A submitted turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    /// The user's message
    pub message: String,
    /// Earlier dialogue, oldest first
    #[serde(default, alias = "chatHistory")]
    pub chat_history: Vec<HistoryMessage>,
    /// Preferences, when onboarding produced them
    #[serde(default, alias = "userPreferences")]
    pub preferences: Option<UserPreferences>,
}

/// Result of a turn: responses or an error, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnResponse {
    /// One or two response strings
    Responses {
        /// In display order
        responses: Vec<String>,
    },
    /// A persona-styled failure message
    Error {
        /// Message for the user
        error: String,
    },
}

/// Result of a haiku request: a haiku or an error, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HaikuResponse {
    /// The composed haiku
    Haiku {
        /// Three lines
        haiku: String,
    },
    /// A persona-styled failure message
    Error {
        /// Message for the user
        error: String,
    },
}

struct Backend {
    provider: Arc<dyn Provider>,
    orchestrator: TurnOrchestrator,
}

/// Turn submission, haiku generation and error formatting
pub struct AizenService {
    history_window: usize,
    backend: Option<Backend>,
}

impl AizenService {
    /// Build the service from configuration
    ///
    /// A missing or placeholder API key is not an error here: every call then
    /// answers with the fixed configuration message.
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be constructed for another reason
    /// (unknown provider type, HTTP client setup).
    pub fn from_config(config: &Config) -> Result<Self> {
        if !has_usable_credential(config) {
            tracing::warn!("No usable API key; all requests will report the configuration error");
            return Ok(Self {
                history_window: config.agent.history_window,
                backend: None,
            });
        }

        let provider = create_provider(&config.provider)?;
        Ok(Self::with_provider(provider, config))
    }

    /// Build the service around an existing provider
    pub fn with_provider(provider: Arc<dyn Provider>, config: &Config) -> Self {
        let assessor: Arc<dyn CapabilityAssessor> = Arc::new(ModelAssessor::new(provider.clone()));
        Self::with_assessor(provider, assessor, config)
    }

    /// Build the service with a custom assessor
    pub fn with_assessor(
        provider: Arc<dyn Provider>,
        assessor: Arc<dyn CapabilityAssessor>,
        config: &Config,
    ) -> Self {
        let tools = Arc::new(
            ToolRegistryBuilder::new(provider.clone())
                .with_tools_config(config.tools.clone())
                .build(),
        );
        let composer =
            ResponseComposer::new(provider.clone(), tools.clone(), config.agent.max_tool_rounds);
        let orchestrator = TurnOrchestrator::new(assessor, composer, tools);

        Self {
            history_window: config.agent.history_window,
            backend: Some(Backend {
                provider,
                orchestrator,
            }),
        }
    }

    /// Whether a usable credential was found
    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Run one turn
    ///
    /// Only the most recent `agent.history_window` user/assistant messages
    /// of `chat_history` reach the model.
    pub async fn submit_turn(&self, request: TurnRequest) -> TurnResponse {
        let Some(backend) = &self.backend else {
            tracing::error!("Turn rejected: GOOGLE_API_KEY is not set or is a placeholder");
            return TurnResponse::Error {
                error: API_KEY_ERROR_MESSAGE.to_string(),
            };
        };

        let dialogue: Vec<HistoryMessage> = request
            .chat_history
            .into_iter()
            .filter(|m| m.role == "user" || m.role == "assistant")
            .collect();
        let start = dialogue.len().saturating_sub(self.history_window);

        match backend
            .orchestrator
            .run_turn(&request.message, &dialogue[start..], request.preferences)
            .await
        {
            Ok(responses) => TurnResponse::Responses { responses },
            Err(e) => {
                tracing::error!("Turn failed: {}", e);
                TurnResponse::Error {
                    error: self.describe_failure(&e, GENERIC_ERROR_MESSAGE).await,
                }
            }
        }
    }

    /// Compose a 5-7-5 haiku on a theme
    pub async fn generate_haiku(&self, theme: &str) -> HaikuResponse {
        let Some(backend) = &self.backend else {
            tracing::error!("Haiku rejected: GOOGLE_API_KEY is not set or is a placeholder");
            return HaikuResponse::Error {
                error: API_KEY_ERROR_MESSAGE.to_string(),
            };
        };

        let outcome = complete_text(backend.provider.as_ref(), None, &haiku_prompt(theme))
            .await
            .and_then(|text| text.ok_or_else(|| AizenError::EmptyResponse.into()));

        match outcome {
            Ok(haiku) => HaikuResponse::Haiku { haiku },
            Err(e) => {
                tracing::error!("Haiku failed: {}", e);
                HaikuResponse::Error {
                    error: self.describe_failure(&e, HAIKU_ERROR_MESSAGE).await,
                }
            }
        }
    }

    /// Rephrase a raw error message in the persona
    pub async fn format_error(&self, raw_error: &str) -> String {
        let Some(backend) = &self.backend else {
            return API_KEY_ERROR_MESSAGE.to_string();
        };

        match complete_text(backend.provider.as_ref(), None, &error_format_prompt(raw_error)).await {
            Ok(Some(text)) => text,
            Ok(None) => GENERIC_ERROR_MESSAGE.to_string(),
            Err(e) if is_credential_error(&e) => API_KEY_ERROR_MESSAGE.to_string(),
            Err(e) => {
                tracing::warn!("Error formatting failed: {}", e);
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }

    async fn describe_failure(&self, error: &anyhow::Error, fallback: &str) -> String {
        if is_credential_error(error) {
            return API_KEY_ERROR_MESSAGE.to_string();
        }
        let Some(backend) = &self.backend else {
            return API_KEY_ERROR_MESSAGE.to_string();
        };

        match complete_text(
            backend.provider.as_ref(),
            None,
            &error_format_prompt(&error.to_string()),
        )
        .await
        {
            Ok(Some(text)) => text,
            Ok(None) => fallback.to_string(),
            Err(e) => {
                tracing::warn!("Error formatting failed: {}", e);
                fallback.to_string()
            }
        }
    }
}
