//! User preference types
//!
//! Preferences shape how Aizen phrases its answers: the tone of voice, the
//! answer length, and how much Bushido philosophy is woven in. They only
//! influence prompt construction and are never validated beyond enum
//! membership.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tone of voice Aizen uses when answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tone {
    /// Respectful, polite language
    Formal,
    /// Mentor-like explanations
    #[default]
    Guiding,
    /// Short and to the point
    Concise,
}

/// Preferred answer length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnswerLength {
    /// Thorough, multi-paragraph answers
    Detailed,
    /// A few sentences
    #[default]
    Moderate,
    /// One or two sentences
    Brief,
}

/// How strongly philosophical flavor is woven into answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PhilosophicalInterest {
    /// Use Bushido concepts wherever they fit
    High,
    /// Occasional references
    #[default]
    Moderate,
    /// Plain answers
    Low,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Formal => write!(f, "Formal"),
            Self::Guiding => write!(f, "Guiding"),
            Self::Concise => write!(f, "Concise"),
        }
    }
}

impl fmt::Display for AnswerLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detailed => write!(f, "Detailed"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Brief => write!(f, "Brief"),
        }
    }
}

impl fmt::Display for PhilosophicalInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl Tone {
    /// Parse a tone from a string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use aizen::preferences::Tone;
    ///
    /// assert_eq!(Tone::parse_str("formal").unwrap(), Tone::Formal);
    /// assert!(Tone::parse_str("loud").is_err());
    /// ```
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "formal" => Ok(Self::Formal),
            "guiding" => Ok(Self::Guiding),
            "concise" => Ok(Self::Concise),
            other => Err(format!("Unknown tone: {}", other)),
        }
    }
}

impl AnswerLength {
    /// Parse an answer length from a string (case-insensitive)
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "detailed" => Ok(Self::Detailed),
            "moderate" => Ok(Self::Moderate),
            "brief" => Ok(Self::Brief),
            other => Err(format!("Unknown answer length: {}", other)),
        }
    }
}

impl PhilosophicalInterest {
    /// Parse a philosophical interest level from a string (case-insensitive)
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "moderate" => Ok(Self::Moderate),
            "low" => Ok(Self::Low),
            other => Err(format!("Unknown philosophical interest: {}", other)),
        }
    }
}

/// The user's stated preferences
///
/// Collected once through onboarding (or left at defaults) and editable at
/// any time afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Preferred tone
    pub tone: Tone,
    /// Preferred answer length
    pub answer_length: AnswerLength,
    /// Interest in Bushido philosophy
    pub philosophical_interest: PhilosophicalInterest,
}

impl UserPreferences {
    /// Create preferences from explicit values
    pub fn new(
        tone: Tone,
        answer_length: AnswerLength,
        philosophical_interest: PhilosophicalInterest,
    ) -> Self {
        Self {
            tone,
            answer_length,
            philosophical_interest,
        }
    }

    /// Whether the user asked for terse answers
    ///
    /// True for a Concise tone or a Brief answer length.
    pub fn prefers_terse(&self) -> bool {
        self.tone == Tone::Concise || self.answer_length == AnswerLength::Brief
    }
}

impl fmt::Display for UserPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tone={}, length={}, philosophy={}",
            self.tone, self.answer_length, self.philosophical_interest
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.tone, Tone::Guiding);
        assert_eq!(prefs.answer_length, AnswerLength::Moderate);
        assert_eq!(prefs.philosophical_interest, PhilosophicalInterest::Moderate);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Tone::parse_str("CONCISE").unwrap(), Tone::Concise);
        assert_eq!(AnswerLength::parse_str(" Brief ").unwrap(), AnswerLength::Brief);
        assert_eq!(
            PhilosophicalInterest::parse_str("high").unwrap(),
            PhilosophicalInterest::High
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(Tone::parse_str("sarcastic").is_err());
        assert!(AnswerLength::parse_str("epic").is_err());
        assert!(PhilosophicalInterest::parse_str("none").is_err());
    }

    #[test]
    fn test_prefers_terse() {
        let mut prefs = UserPreferences::default();
        assert!(!prefs.prefers_terse());
        prefs.tone = Tone::Concise;
        assert!(prefs.prefers_terse());
        prefs.tone = Tone::Formal;
        prefs.answer_length = AnswerLength::Brief;
        assert!(prefs.prefers_terse());
    }

    #[test]
    fn test_serialization_uses_camel_case_and_variant_names() {
        let prefs = UserPreferences::new(Tone::Formal, AnswerLength::Detailed, PhilosophicalInterest::Low);
        let json = serde_json::to_string(&prefs).unwrap();
        assert!(json.contains("\"tone\":\"Formal\""));
        assert!(json.contains("\"answerLength\":\"Detailed\""));
        assert!(json.contains("\"philosophicalInterest\":\"Low\""));
    }

    #[test]
    fn test_json_round_trip() {
        let prefs = UserPreferences::new(Tone::Concise, AnswerLength::Brief, PhilosophicalInterest::High);
        let json = serde_json::to_string(&prefs).unwrap();
        let back: UserPreferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
    }
}
