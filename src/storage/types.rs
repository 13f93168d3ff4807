use serde::{Deserialize, Serialize};

/// Keys of the persisted local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    /// Conversation turns
    ChatHistory,
    /// User preferences
    UserPreferences,
    /// Speech output settings
    TtsSettings,
    /// Whether onboarding was completed or skipped
    OnboardingComplete,
}

impl StateKey {
    /// Key name in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatHistory => "aizen_chat_history",
            Self::UserPreferences => "aizen_user_preferences",
            Self::TtsSettings => "aizen_tts_settings",
            Self::OnboardingComplete => "aizen_quiz_completed",
        }
    }
}

/// Speech output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsSettings {
    /// Speak assistant and error turns aloud
    #[serde(default)]
    pub enabled: bool,
    /// Preferred voice name
    #[serde(default, rename = "voiceURI", alias = "voice")]
    pub voice: Option<String>,
}
