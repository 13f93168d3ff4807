//! Capability assessment
//!
//! Decides, per incoming message and independent of history, whether the
//! turn is a time query, can be answered from background knowledge, or needs
//! a lookup. Time queries are recognized locally without a model call; the
//! rest is classified by the model. A missing or rejected API key is
//! reported; any other failure yields the conservative "needs lookup"
//! assessment.

use crate::credentials::is_credential_error;
use crate::error::Result;
use crate::prompts::{assessor_prompt, ASSESSOR_SYSTEM_PROMPT};
use crate::providers::{Message, Provider};
use crate::tools::clock::find_timezone_in;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

/// Result of assessing one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityAssessment {
    /// Whether background knowledge is enough to answer
    pub can_answer_directly: bool,
    /// Whether the user asked for the current time
    pub is_time_intent: bool,
    /// Short reason given by the classifier, if any
    pub rationale: Option<String>,
    /// Timezone named in a time query, if any
    pub timezone: Option<String>,
}

impl CapabilityAssessment {
    /// The conservative default: not a time query, lookup needed
    pub fn needs_lookup() -> Self {
        Self {
            can_answer_directly: false,
            is_time_intent: false,
            rationale: None,
            timezone: None,
        }
    }

    /// A time query, optionally for a specific timezone
    pub fn time_query(timezone: Option<String>) -> Self {
        Self {
            can_answer_directly: true,
            is_time_intent: true,
            rationale: None,
            timezone,
        }
    }

    /// Answerable from background knowledge
    pub fn direct() -> Self {
        Self {
            can_answer_directly: true,
            ..Self::needs_lookup()
        }
    }
}

/// Strategy for assessing incoming messages
#[async_trait]
pub trait CapabilityAssessor: Send + Sync {
    /// Assess a single user message
    ///
    /// # Errors
    ///
    /// Only credential failures; everything else becomes `needs_lookup()`.
    async fn assess(&self, message: &str) -> Result<CapabilityAssessment>;
}

/// Model-backed assessor with a local time-intent check
pub struct ModelAssessor {
    provider: Arc<dyn Provider>,
}

impl ModelAssessor {
    /// Create an assessor that classifies with the given provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CapabilityAssessor for ModelAssessor {
    async fn assess(&self, message: &str) -> Result<CapabilityAssessment> {
        if is_time_query(message) {
            let timezone = find_timezone_in(message);
            tracing::debug!(timezone = ?timezone, "Recognized time query");
            return Ok(CapabilityAssessment::time_query(timezone));
        }

        let messages = vec![
            Message::system(ASSESSOR_SYSTEM_PROMPT),
            Message::user(assessor_prompt(message)),
        ];

        let assessment = match self.provider.complete(&messages, &[]).await {
            Ok(response) => response.message.text().and_then(parse_assessment),
            Err(e) if is_credential_error(&e) => return Err(e),
            Err(e) => {
                tracing::warn!("Capability assessment failed: {}", e);
                None
            }
        };

        match assessment {
            Some(mut assessment) => {
                if assessment.is_time_intent {
                    assessment.timezone = find_timezone_in(message);
                }
                tracing::debug!(
                    can_answer = assessment.can_answer_directly,
                    time = assessment.is_time_intent,
                    "Assessment complete"
                );
                Ok(assessment)
            }
            None => {
                tracing::warn!("Falling back to lookup for unassessable message");
                crate::agent::metrics::record_assessor_fallback();
                Ok(CapabilityAssessment::needs_lookup())
            }
        }
    }
}

const TIME_PATTERNS: &[&str] = &[
    r"\bwhat\s+time\s+is\s+it\b",
    r"\bwhat\s+time\s+(?:is\s+it\s+)?in\s+\w",
    r"\bwhat(?:'s|\s+is)\s+the\s+(?:current\s+|local\s+)?time(?:\s+(?:in|now|right\s+now|there)\b|\s*[?.!]*\s*$)",
    r"\bcurrent\s+(?:local\s+)?time\b",
    r"\b(?:tell|give)\s+me\s+the\s+(?:current\s+)?time\b",
    r"^\s*(?:the\s+)?(?:local\s+)?time\s+(?:in\s+\S+|now|please)",
    r"\bdo\s+you\s+(?:know|have)\s+the\s+time\b",
];

static TIME_QUERY: OnceLock<Option<Regex>> = OnceLock::new();

/// Whether a message asks for the current time
///
/// # Examples
///
/// ```
/// use aizen::agent::assessor::is_time_query;
///
/// assert!(is_time_query("What time is it?"));
/// assert!(is_time_query("what's the time in Tokyo"));
/// assert!(!is_time_query("What is the time complexity of quicksort?"));
/// ```
pub fn is_time_query(message: &str) -> bool {
    TIME_QUERY
        .get_or_init(|| Regex::new(&format!("(?i)(?:{})", TIME_PATTERNS.join("|"))).ok())
        .as_ref()
        .map(|re| re.is_match(message.trim()))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    #[serde(alias = "canAnswer", alias = "can_answer_directly")]
    can_answer: bool,
    #[serde(default, alias = "isTimeIntent")]
    is_time_intent: Option<bool>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse the classifier's JSON reply
///
/// Accepts a bare object, an object inside a fenced code block, or an object
/// surrounded by prose. Returns `None` when no usable object is found.
pub fn parse_assessment(text: &str) -> Option<CapabilityAssessment> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let raw: RawAssessment = serde_json::from_str(&text[start..=end]).ok()?;
    Some(CapabilityAssessment {
        can_answer_directly: raw.can_answer,
        is_time_intent: raw.is_time_intent.unwrap_or(false),
        rationale: raw.reasoning.filter(|r| !r.trim().is_empty()),
        timezone: None,
    })
}
