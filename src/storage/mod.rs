use crate::agent::conversation::ChatTurn;
use crate::error::{AizenError, Result};
use crate::preferences::UserPreferences;
use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod types;
pub use types::{StateKey, TtsSettings};

/// Local key-value store for chat history, preferences and settings
///
/// Values are JSON documents keyed by `StateKey`. Corrupt values are logged
/// and treated as absent by the typed accessors.
pub struct LocalStore {
    db_path: PathBuf,
}

impl LocalStore {
    /// Open the store in the user's data directory
    ///
    /// `AIZEN_STATE_DB` overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("AIZEN_STATE_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("dev", "aizen", "aizen")
            .ok_or_else(|| AizenError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| AizenError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("state.db"))
    }

    /// Open the store at the given path
    ///
    /// # Examples
    ///
    /// ```
    /// use aizen::storage::LocalStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = LocalStore::new_with_path(dir.path().join("state.db")).unwrap();
    /// assert!(!store.onboarding_complete().unwrap());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| AizenError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        tracing::debug!(path = %store.db_path.display(), "Opened local store");
        Ok(store)
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| AizenError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value JSON NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| AizenError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Read and deserialize a value
    ///
    /// # Errors
    ///
    /// Returns `AizenError::Storage` on database failure and
    /// `AizenError::Serialization` when the stored JSON does not fit `T`.
    pub fn get<T: DeserializeOwned>(&self, key: StateKey) -> Result<Option<T>> {
        let conn = self.connect()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query state")
            .map_err(|e| AizenError::Storage(e.to_string()))?;

        match raw {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).map_err(AizenError::Serialization)?,
            )),
            None => Ok(None),
        }
    }

    /// Serialize and write a value, replacing any previous one
    pub fn set<T: Serialize + ?Sized>(&self, key: StateKey, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .context("Failed to serialize state")
            .map_err(|e| AizenError::Storage(e.to_string()))?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key.as_str(), json, Utc::now().to_rfc3339()],
        )
        .context("Failed to write state")
        .map_err(|e| AizenError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete a value
    pub fn remove(&self, key: StateKey) -> Result<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM kv WHERE key = ?", params![key.as_str()])
            .context("Failed to delete state")
            .map_err(|e| AizenError::Storage(e.to_string()))?;
        Ok(())
    }

    fn get_or_default<T: DeserializeOwned + Default>(&self, key: StateKey) -> Result<T> {
        match self.get(key) {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(e) if matches!(e.downcast_ref::<AizenError>(), Some(AizenError::Serialization(_))) => {
                tracing::warn!("Ignoring unreadable {}: {}", key.as_str(), e);
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Stored conversation, oldest first
    pub fn load_history(&self) -> Result<Vec<ChatTurn>> {
        self.get_or_default(StateKey::ChatHistory)
    }

    /// Replace the stored conversation
    pub fn save_history(&self, turns: &[ChatTurn]) -> Result<()> {
        self.set(StateKey::ChatHistory, turns)
    }

    /// Delete the stored conversation
    pub fn clear_history(&self) -> Result<()> {
        self.remove(StateKey::ChatHistory)
    }

    /// Stored preferences, if onboarding produced any
    pub fn load_preferences(&self) -> Result<Option<UserPreferences>> {
        self.get_or_default(StateKey::UserPreferences)
    }

    /// Store preferences
    pub fn save_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        self.set(StateKey::UserPreferences, preferences)
    }

    /// Stored speech output settings
    pub fn load_tts_settings(&self) -> Result<TtsSettings> {
        self.get_or_default(StateKey::TtsSettings)
    }

    /// Store speech output settings
    pub fn save_tts_settings(&self, settings: &TtsSettings) -> Result<()> {
        self.set(StateKey::TtsSettings, settings)
    }

    /// Whether onboarding was completed or skipped
    pub fn onboarding_complete(&self) -> Result<bool> {
        self.get_or_default(StateKey::OnboardingComplete)
    }

    /// Record onboarding completion
    pub fn set_onboarding_complete(&self, complete: bool) -> Result<()> {
        self.set(StateKey::OnboardingComplete, &complete)
    }
}
