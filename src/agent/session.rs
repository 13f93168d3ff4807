//! Conversation session
//!
//! Owns the conversation log, the preference record and the speech output
//! settings, drives the service once per submitted message, and persists
//! everything to the local store.
//!
//! Only one turn runs at a time: a submission while another is in flight is
//! rejected with `AizenError::SessionBusy`.

use crate::agent::conversation::{ChatTurn, Conversation, TurnRole};
use crate::error::{AizenError, Result};
use crate::preferences::UserPreferences;
use crate::service::{AizenService, HaikuResponse, TurnRequest, TurnResponse};
use crate::speech::SpeechSynthesizer;
use crate::storage::{LocalStore, TtsSettings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Opening line of a fresh conversation
pub const GREETING: &str = "Greetings. I am Aizen. How may I assist you on your path today?";
/// Line shown after the conversation is cleared
pub const CLEARED_MESSAGE: &str = "The path is cleared. How may I assist you anew?";
/// Status shown while a turn is processed
pub const THINKING_STATUS: &str = "Aizen is meditating...";

/// Status shown while a haiku is composed
pub fn haiku_status(theme: &str) -> String {
    format!("Aizen contemplates a haiku on \"{}\"...", theme)
}

#[derive(Debug, Default)]
struct SessionState {
    conversation: Conversation,
    preferences: Option<UserPreferences>,
    tts: TtsSettings,
    onboarding_complete: bool,
}

/// Clears the busy flag when a turn ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A single user's conversation with Aizen
pub struct ChatSession {
    service: Arc<AizenService>,
    store: LocalStore,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    history_window: usize,
    state: Mutex<SessionState>,
    busy: AtomicBool,
}

impl ChatSession {
    /// Restore a session from the store
    ///
    /// Greets when onboarding is complete and there is no stored history.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    pub async fn load(
        service: Arc<AizenService>,
        store: LocalStore,
        history_window: usize,
    ) -> Result<Self> {
        let state = SessionState {
            conversation: Conversation::from_turns(store.load_history()?),
            preferences: store.load_preferences()?,
            tts: store.load_tts_settings()?,
            onboarding_complete: store.onboarding_complete()?,
        };

        let session = Self {
            service,
            store,
            synthesizer: None,
            history_window,
            state: Mutex::new(state),
            busy: AtomicBool::new(false),
        };

        let greet = {
            let state = session.lock();
            state.onboarding_complete && state.conversation.is_empty()
        };
        if greet {
            session.push_and_persist(ChatTurn::assistant(GREETING)).await;
        }

        let (turns, onboarding) = {
            let state = session.lock();
            (state.conversation.len(), state.onboarding_complete)
        };
        tracing::info!(turns, onboarding, "Session loaded");
        Ok(session)
    }

    /// Attach a speech synthesizer for spoken replies
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AizenError::SessionBusy)?;
        Ok(BusyGuard(&self.busy))
    }

    /// Whether a turn is in progress
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of the conversation, oldest first
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.lock().conversation.turns().to_vec()
    }

    /// Current preferences
    pub fn preferences(&self) -> Option<UserPreferences> {
        self.lock().preferences
    }

    /// Current speech output settings
    pub fn tts_settings(&self) -> TtsSettings {
        self.lock().tts.clone()
    }

    /// Whether onboarding was completed or skipped
    pub fn onboarding_complete(&self) -> bool {
        self.lock().onboarding_complete
    }

    /// Submit a user message
    ///
    /// Blank input is ignored. Returns the turns added in response (assistant
    /// turns or a single error turn); the transient status turn is removed
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns `AizenError::SessionBusy` while another turn is in progress.
    pub async fn submit(&self, text: &str) -> Result<Vec<ChatTurn>> {
        let message = text.trim();
        if message.is_empty() {
            return Ok(Vec::new());
        }
        let _busy = self.begin()?;

        let (request, status_id) = {
            let mut state = self.lock();
            let chat_history = state.conversation.recent_history(self.history_window);
            state.conversation.push(ChatTurn::user(message));
            let status_id = state.conversation.push(ChatTurn::status(THINKING_STATUS));
            let request = TurnRequest {
                message: message.to_string(),
                chat_history,
                preferences: state.preferences,
            };
            (request, status_id)
        };

        let added = match self.service.submit_turn(request).await {
            TurnResponse::Responses { responses } => {
                responses.into_iter().map(ChatTurn::assistant).collect()
            }
            TurnResponse::Error { error } => vec![ChatTurn::error(error)],
        };

        self.complete(status_id, &added).await;
        Ok(added)
    }

    /// Compose a haiku on a theme
    ///
    /// A blank theme is ignored. Returns the haiku turn or an error turn.
    ///
    /// # Errors
    ///
    /// Returns `AizenError::SessionBusy` while another turn is in progress.
    pub async fn generate_haiku(&self, theme: &str) -> Result<Vec<ChatTurn>> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Ok(Vec::new());
        }
        let _busy = self.begin()?;

        let status_id = self.lock().conversation.push(ChatTurn::status(haiku_status(theme)));

        let added = match self.service.generate_haiku(theme).await {
            HaikuResponse::Haiku { haiku } => vec![ChatTurn::haiku(haiku)],
            HaikuResponse::Error { error } => vec![ChatTurn::error(error)],
        };

        self.complete(status_id, &added).await;
        Ok(added)
    }

    async fn complete(&self, status_id: Uuid, added: &[ChatTurn]) {
        {
            let mut state = self.lock();
            state.conversation.remove(status_id);
            for turn in added {
                state.conversation.push(turn.clone());
            }
        }
        self.persist_history();

        let spoken: Vec<&str> = added
            .iter()
            .filter(|t| matches!(t.role, TurnRole::Assistant | TurnRole::Error))
            .map(|t| t.content.as_str())
            .collect();
        if !spoken.is_empty() {
            self.speak(&spoken.join("\n")).await;
        }
    }

    /// Store preferences and mark onboarding complete
    ///
    /// An empty conversation, or one holding only the greeting, is reset to
    /// a fresh greeting.
    pub async fn save_preferences(&self, preferences: UserPreferences) -> Result<()> {
        self.store.save_preferences(&preferences)?;
        self.store.set_onboarding_complete(true)?;

        let regreet = {
            let mut state = self.lock();
            state.preferences = Some(preferences);
            state.onboarding_complete = true;
            if state.conversation.is_empty_or_only(GREETING) {
                state.conversation.clear();
                true
            } else {
                false
            }
        };
        tracing::info!(%preferences, "Preferences saved");

        if regreet {
            self.push_and_persist(ChatTurn::assistant(GREETING)).await;
        }
        Ok(())
    }

    /// Mark onboarding complete without preferences
    pub async fn skip_onboarding(&self) -> Result<()> {
        self.store.set_onboarding_complete(true)?;
        let greet = {
            let mut state = self.lock();
            state.onboarding_complete = true;
            state.conversation.is_empty()
        };
        if greet {
            self.push_and_persist(ChatTurn::assistant(GREETING)).await;
        }
        Ok(())
    }

    /// Empty the conversation and its stored copy
    pub async fn clear(&self) -> Result<()> {
        self.lock().conversation.clear();
        self.store.clear_history()?;
        tracing::info!("Conversation cleared");
        self.push_and_persist(ChatTurn::assistant(CLEARED_MESSAGE)).await;
        Ok(())
    }

    /// Turn spoken replies on or off
    pub async fn set_tts_enabled(&self, enabled: bool) -> Result<()> {
        let settings = {
            let mut state = self.lock();
            state.tts.enabled = enabled;
            state.tts.clone()
        };
        self.store.save_tts_settings(&settings)?;
        if !enabled {
            if let Some(synthesizer) = &self.synthesizer {
                synthesizer.cancel().await;
            }
        }
        Ok(())
    }

    /// Choose the voice for spoken replies
    pub async fn set_voice(&self, voice: Option<String>) -> Result<()> {
        let settings = {
            let mut state = self.lock();
            state.tts.voice = voice.clone();
            state.tts.clone()
        };
        self.store.save_tts_settings(&settings)?;
        if let Some(synthesizer) = &self.synthesizer {
            synthesizer.set_voice(voice).await;
        }
        Ok(())
    }

    async fn push_and_persist(&self, turn: ChatTurn) {
        let spoken = turn.content.clone();
        self.lock().conversation.push(turn);
        self.persist_history();
        self.speak(&spoken).await;
    }

    fn persist_history(&self) {
        let turns = self.lock().conversation.persistable();
        if let Err(e) = self.store.save_history(&turns) {
            tracing::warn!("Failed to persist conversation: {}", e);
        }
    }

    async fn speak(&self, text: &str) {
        let enabled = self.lock().tts.enabled;
        if !enabled {
            return;
        }
        if let Some(synthesizer) = &self.synthesizer {
            if let Err(e) = synthesizer.speak(text).await {
                tracing::warn!("Speech output failed: {}", e);
            }
        }
    }
}
