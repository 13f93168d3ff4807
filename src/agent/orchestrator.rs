//! Turn orchestration
//!
//! One turn runs the capability assessment and then exactly one of three
//! branches:
//!
//! - time: the clock answers, wrapped in a persona sentence
//! - lookup: an acknowledgement, then the search outcome
//! - composed: the response composer answers, possibly using tools
//!
//! Processing is strictly sequential. The orchestrator never retries and
//! surfaces no failure other than a missing or rejected API key.

use crate::agent::assessor::{CapabilityAssessment, CapabilityAssessor};
use crate::agent::composer::ResponseComposer;
use crate::agent::conversation::HistoryMessage;
use crate::agent::metrics::TurnMetrics;
use crate::credentials::{is_credential_error, mentions_credential};
use crate::error::{AizenError, Result};
use crate::preferences::{Tone, UserPreferences};
use crate::tools::clock::CLOCK_SENTINELS;
use crate::tools::search::SEARCH_SENTINELS;
use crate::tools::{ToolFailure, ToolRegistry, ToolResult, CLOCK_TOOL, SEARCH_TOOL};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Acknowledgement for users who asked for terse answers
pub const TERSE_ACK: &str = "Let me check that for you.";
/// Acknowledgement for a formal tone
pub const FORMAL_ACK: &str = "Permit me a moment to consult available knowledge on this topic.";
/// Default acknowledgement
pub const DEFAULT_ACK: &str =
    "I am not immediately familiar with that. Allow me to consult my knowledge base.";

/// Substituted when the composer produces nothing usable
pub const COMPOSER_FALLBACK: &str = "Forgive me. My thoughts did not take form as they should \
have. Please ask once more, and I shall answer with a clearer mind.";

/// Which branch handled a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnBranch {
    /// Clock answered
    Time,
    /// Acknowledgement plus search
    Lookup,
    /// Composer answered
    Composed,
}

impl TurnBranch {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Lookup => "lookup",
            Self::Composed => "composed",
        }
    }

    /// Pick the branch for an assessment
    pub fn for_assessment(assessment: &CapabilityAssessment) -> Self {
        if assessment.is_time_intent {
            Self::Time
        } else if !assessment.can_answer_directly {
            Self::Lookup
        } else {
            Self::Composed
        }
    }
}

/// Acknowledgement shown before a lookup
///
/// # Examples
///
/// ```
/// use aizen::agent::orchestrator::{acknowledgement, DEFAULT_ACK, TERSE_ACK};
/// use aizen::preferences::{AnswerLength, PhilosophicalInterest, Tone, UserPreferences};
///
/// assert_eq!(acknowledgement(None), DEFAULT_ACK);
/// let brief = UserPreferences::new(Tone::Formal, AnswerLength::Brief, PhilosophicalInterest::High);
/// assert_eq!(acknowledgement(Some(&brief)), TERSE_ACK);
/// ```
pub fn acknowledgement(preferences: Option<&UserPreferences>) -> &'static str {
    match preferences {
        Some(prefs) if prefs.prefers_terse() => TERSE_ACK,
        Some(prefs) if prefs.tone == Tone::Formal => FORMAL_ACK,
        _ => DEFAULT_ACK,
    }
}

/// Runs one turn from assessment to response strings
pub struct TurnOrchestrator {
    assessor: Arc<dyn CapabilityAssessor>,
    composer: ResponseComposer,
    tools: Arc<ToolRegistry>,
}

impl TurnOrchestrator {
    /// Create an orchestrator
    pub fn new(
        assessor: Arc<dyn CapabilityAssessor>,
        composer: ResponseComposer,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            assessor,
            composer,
            tools,
        }
    }

    /// Run a turn
    ///
    /// Returns one string for the time and composed branches and exactly two
    /// (acknowledgement first) for the lookup branch.
    ///
    /// # Errors
    ///
    /// Only a missing or rejected API key is returned, whichever step hit
    /// it; every other failure becomes persona text.
    pub async fn run_turn(
        &self,
        message: &str,
        history: &[HistoryMessage],
        preferences: Option<UserPreferences>,
    ) -> Result<Vec<String>> {
        let span = info_span!("turn", branch = tracing::field::Empty);
        let metrics = TurnMetrics::start();

        async {
            let assessment = self.assessor.assess(message).await?;
            let branch = TurnBranch::for_assessment(&assessment);
            tracing::Span::current().record("branch", branch.as_str());

            let responses = match branch {
                TurnBranch::Time => vec![self.tell_time(assessment.timezone.as_deref()).await],
                TurnBranch::Lookup => vec![
                    acknowledgement(preferences.as_ref()).to_string(),
                    self.look_up(message).await?,
                ],
                TurnBranch::Composed => {
                    match self.composer.compose(message, history, preferences).await {
                        Ok(text) => vec![text],
                        Err(e) if is_credential_error(&e) => return Err(e),
                        Err(e) => {
                            warn!("Composer failed, using fallback: {}", e);
                            vec![COMPOSER_FALLBACK.to_string()]
                        }
                    }
                }
            };

            info!(
                branch = branch.as_str(),
                responses = responses.len(),
                elapsed_ms = metrics.elapsed().as_millis() as u64,
                "Turn complete"
            );
            metrics.finish(branch.as_str());
            Ok(responses)
        }
        .instrument(span)
        .await
    }

    async fn tell_time(&self, timezone: Option<&str>) -> String {
        let args = match timezone {
            Some(tz) => serde_json::json!({ "timezone": tz }),
            None => serde_json::json!({}),
        };
        let result = self
            .tools
            .execute(CLOCK_TOOL, args)
            .await
            .unwrap_or_else(|e| ToolResult::error(e.to_string()));

        match (&result, timezone) {
            (ToolResult::Found(time), Some(tz)) => {
                format!("In {}, the present moment reads {}.", place_name(tz), time)
            }
            (ToolResult::Found(time), None) => format!("The present moment reads {}.", time),
            (failed, _) => failed.render(&CLOCK_SENTINELS),
        }
    }

    async fn look_up(&self, message: &str) -> Result<String> {
        let result = self
            .tools
            .execute(SEARCH_TOOL, serde_json::json!({ "query": message }))
            .await;
        match result {
            Ok(ToolResult::Failed(ToolFailure::Error(detail))) if mentions_credential(&detail) => {
                Err(AizenError::Provider(detail).into())
            }
            Ok(result) => Ok(result.render(&SEARCH_SENTINELS)),
            Err(e) => {
                warn!("Search unavailable: {}", e);
                Ok(SEARCH_SENTINELS.error.to_string())
            }
        }
    }
}

/// "Asia/Tokyo" -> "Tokyo", "America/New_York" -> "New York"
fn place_name(timezone: &str) -> String {
    timezone
        .rsplit('/')
        .next()
        .unwrap_or(timezone)
        .replace('_', " ")
}
