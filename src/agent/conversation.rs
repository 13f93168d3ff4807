//! Conversation log
//!
//! The ordered sequence of chat turns shown to the user. Turns are immutable
//! once created and are only ever removed all at once (clear) or, for the
//! transient status turn, by id when the turn it announced completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnRole {
    /// The person chatting
    User,
    /// Aizen
    Assistant,
    /// Transient progress notice ("Aizen is meditating...")
    SystemStatus,
    /// A failure reported to the user
    Error,
}

impl TurnRole {
    /// Role name used in model history
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::SystemStatus => "system-status",
            Self::Error => "error",
        }
    }
}

/// How a turn's content should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    /// Ordinary text
    #[default]
    Plain,
    /// A three-line haiku
    Haiku,
}

/// One entry in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    /// Unique identifier
    pub id: Uuid,
    /// Who produced the turn
    pub role: TurnRole,
    /// Text content
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Presentation kind
    #[serde(default)]
    pub kind: TurnKind,
}

impl ChatTurn {
    /// Create a plain turn
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            kind: TurnKind::Plain,
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// Create a transient status turn
    pub fn status(content: impl Into<String>) -> Self {
        Self::new(TurnRole::SystemStatus, content)
    }

    /// Create an error turn
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Error, content)
    }

    /// Create an assistant haiku turn
    pub fn haiku(content: impl Into<String>) -> Self {
        Self {
            kind: TurnKind::Haiku,
            ..Self::assistant(content)
        }
    }

    /// Whether the turn is part of the user/assistant dialogue
    pub fn is_dialogue(&self) -> bool {
        matches!(self.role, TurnRole::User | TurnRole::Assistant)
    }
}

/// A `{role, content}` pair as forwarded to the response composer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl HistoryMessage {
    /// Create a history message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Ordered conversation log, oldest first
///
/// # Examples
///
/// ```
/// use aizen::agent::{ChatTurn, Conversation};
///
/// let mut conversation = Conversation::new();
/// conversation.push(ChatTurn::user("Hello"));
/// conversation.push(ChatTurn::assistant("Greetings."));
/// assert_eq!(conversation.recent_history(10).len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a conversation from stored turns
    ///
    /// Status turns are transient and are dropped if present.
    pub fn from_turns(turns: Vec<ChatTurn>) -> Self {
        Self {
            turns: turns
                .into_iter()
                .filter(|t| t.role != TurnRole::SystemStatus)
                .collect(),
        }
    }

    /// Append a turn and return its id
    pub fn push(&mut self, turn: ChatTurn) -> Uuid {
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    /// Remove a turn by id
    pub fn remove(&mut self, id: Uuid) -> Option<ChatTurn> {
        let index = self.turns.iter().position(|t| t.id == id)?;
        Some(self.turns.remove(index))
    }

    /// All turns, oldest first
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The newest turn
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation has no turns
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Remove every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The most recent `window` dialogue turns for the model
    ///
    /// Only user and assistant turns are forwarded; status and error turns
    /// are display-only.
    pub fn recent_history(&self, window: usize) -> Vec<HistoryMessage> {
        let dialogue: Vec<&ChatTurn> = self.turns.iter().filter(|t| t.is_dialogue()).collect();
        let start = dialogue.len().saturating_sub(window);
        dialogue[start..]
            .iter()
            .map(|t| HistoryMessage::new(t.role.as_str(), t.content.clone()))
            .collect()
    }

    /// Turns worth persisting (everything except status turns)
    pub fn persistable(&self) -> Vec<ChatTurn> {
        self.turns
            .iter()
            .filter(|t| t.role != TurnRole::SystemStatus)
            .cloned()
            .collect()
    }

    /// Whether the conversation is empty or holds only the given greeting
    pub fn is_empty_or_only(&self, greeting: &str) -> bool {
        match self.turns.as_slice() {
            [] => true,
            [only] => only.role == TurnRole::Assistant && only.content == greeting,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_insertion_order() {
        let mut conversation = Conversation::new();
        conversation.push(ChatTurn::user("one"));
        conversation.push(ChatTurn::assistant("two"));
        conversation.push(ChatTurn::user("three"));
        let contents: Vec<&str> = conversation
            .turns()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_remove_status_turn_by_id() {
        let mut conversation = Conversation::new();
        conversation.push(ChatTurn::user("q"));
        let status = conversation.push(ChatTurn::status("Aizen is meditating..."));
        assert_eq!(conversation.len(), 2);
        let removed = conversation.remove(status).unwrap();
        assert_eq!(removed.role, TurnRole::SystemStatus);
        assert_eq!(conversation.len(), 1);
        assert!(conversation.remove(status).is_none());
    }

    #[test]
    fn test_recent_history_window_and_roles() {
        let mut conversation = Conversation::new();
        for i in 0..8 {
            conversation.push(ChatTurn::user(format!("u{}", i)));
            conversation.push(ChatTurn::assistant(format!("a{}", i)));
        }
        conversation.push(ChatTurn::error("oops"));
        conversation.push(ChatTurn::status("working"));

        let history = conversation.recent_history(10);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0], HistoryMessage::new("user", "u3"));
        assert_eq!(history[9], HistoryMessage::new("assistant", "a7"));
        assert!(history
            .iter()
            .all(|m| m.role == "user" || m.role == "assistant"));
    }

    #[test]
    fn test_recent_history_shorter_than_window() {
        let mut conversation = Conversation::new();
        conversation.push(ChatTurn::user("only"));
        assert_eq!(conversation.recent_history(10).len(), 1);
        assert!(conversation.recent_history(0).is_empty());
    }

    #[test]
    fn test_persistable_and_from_turns_drop_status() {
        let mut conversation = Conversation::new();
        conversation.push(ChatTurn::user("q"));
        conversation.push(ChatTurn::status("..."));
        assert_eq!(conversation.persistable().len(), 1);

        let restored = Conversation::from_turns(vec![ChatTurn::status("..."), ChatTurn::haiku("a\nb\nc")]);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.turns()[0].kind, TurnKind::Haiku);
    }

    #[test]
    fn test_is_empty_or_only_greeting() {
        let greeting = "Greetings.";
        let mut conversation = Conversation::new();
        assert!(conversation.is_empty_or_only(greeting));
        conversation.push(ChatTurn::assistant(greeting));
        assert!(conversation.is_empty_or_only(greeting));
        conversation.push(ChatTurn::user("hi"));
        assert!(!conversation.is_empty_or_only(greeting));
    }

    #[test]
    fn test_turn_serialization() {
        let turn = ChatTurn::status("x");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "system-status");
        assert_eq!(json["kind"], "plain");
        assert!(json.get("createdAt").is_some());

        let back: ChatTurn = serde_json::from_value(json).unwrap();
        assert_eq!(back, turn);
    }
}
