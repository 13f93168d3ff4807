//! Integration tests for the chat session and its persistence

mod common;

use aizen::agent::conversation::TurnRole;
use aizen::agent::session::{ChatSession, CLEARED_MESSAGE, GREETING};
use aizen::credentials::API_KEY_ERROR_MESSAGE;
use aizen::error::{AizenError, Result};
use aizen::preferences::{AnswerLength, PhilosophicalInterest, Tone, UserPreferences};
use aizen::providers::{CompletionResponse, Message, Provider};
use aizen::service::AizenService;
use aizen::storage::LocalStore;
use aizen::Config;
use async_trait::async_trait;
use common::{keyed_config, FakeProvider};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

const DIRECT: &str = r#"{"canAnswer": true, "isTimeIntent": false}"#;

fn open(path: &Path) -> LocalStore {
    LocalStore::new_with_path(path).expect("store should open")
}

async fn session_with(provider: Arc<dyn Provider>, db: &Path) -> ChatSession {
    let config = keyed_config();
    let service = Arc::new(AizenService::with_provider(provider, &config));
    ChatSession::load(service, open(db), config.agent.history_window)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_onboarding_skip_greets_once() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("state.db");

    let session = session_with(Arc::new(FakeProvider::new()), &db).await;
    assert!(!session.onboarding_complete());
    assert!(session.turns().is_empty());

    session.skip_onboarding().await.unwrap();
    let turns = session.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].content, GREETING);

    // Reloading restores the greeting instead of adding a second one
    let reloaded = session_with(Arc::new(FakeProvider::new()), &db).await;
    assert!(reloaded.onboarding_complete());
    assert_eq!(reloaded.turns().len(), 1);
}

#[tokio::test]
async fn test_conversation_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("state.db");

    let provider = Arc::new(
        FakeProvider::new()
            .text(DIRECT)
            .text("Courage is acting rightly despite fear.")
            .text(DIRECT)
            .text("Rectitude comes first."),
    );
    let session = session_with(provider.clone(), &db).await;
    session.skip_onboarding().await.unwrap();

    let added = session.submit("What is courage?").await.unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].role, TurnRole::Assistant);

    session.submit("And the first virtue?").await.unwrap();

    // The second composer call carries the earlier exchange, but not the
    // current message twice
    let calls = provider.calls();
    let second_composer = &calls[3];
    let texts: Vec<&str> = second_composer.iter().filter_map(|m| m.text()).collect();
    assert!(texts.contains(&"What is courage?"));
    assert_eq!(
        texts.iter().filter(|t| **t == "And the first virtue?").count(),
        1
    );

    drop(session);
    let reloaded = session_with(Arc::new(FakeProvider::new()), &db).await;
    let contents: Vec<String> = reloaded.turns().into_iter().map(|t| t.content).collect();
    assert_eq!(
        contents,
        vec![
            GREETING.to_string(),
            "What is courage?".to_string(),
            "Courage is acting rightly despite fear.".to_string(),
            "And the first virtue?".to_string(),
            "Rectitude comes first.".to_string(),
        ]
    );
    assert!(reloaded
        .turns()
        .iter()
        .all(|t| t.role != TurnRole::SystemStatus));
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let tmp = TempDir::new().unwrap();
    let provider = Arc::new(FakeProvider::new());
    let session = session_with(provider.clone(), &tmp.path().join("state.db")).await;

    assert!(session.submit("   ").await.unwrap().is_empty());
    assert!(session.turns().is_empty());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_missing_key_adds_error_turn() {
    let tmp = TempDir::new().unwrap();
    let config = Config::default();
    let service = Arc::new(AizenService::from_config(&config).unwrap());
    let session = ChatSession::load(service, open(&tmp.path().join("state.db")), 10)
        .await
        .unwrap();

    let added = session.submit("Hello").await.unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].role, TurnRole::Error);
    assert_eq!(added[0].content, API_KEY_ERROR_MESSAGE);
    assert_eq!(session.turns().len(), 2);
}

#[tokio::test]
async fn test_clear_leaves_cleared_message() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("state.db");
    let provider = Arc::new(FakeProvider::new().text(DIRECT).text("Answer."));
    let session = session_with(provider, &db).await;
    session.skip_onboarding().await.unwrap();
    session.submit("Question").await.unwrap();

    session.clear().await.unwrap();

    let turns = session.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].content, CLEARED_MESSAGE);
    let stored = open(&db).load_history().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, CLEARED_MESSAGE);
}

#[tokio::test]
async fn test_saving_preferences_regreets_fresh_conversation() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("state.db");
    let session = session_with(Arc::new(FakeProvider::new()), &db).await;
    session.skip_onboarding().await.unwrap();

    let prefs = UserPreferences::new(Tone::Formal, AnswerLength::Detailed, PhilosophicalInterest::High);
    session.save_preferences(prefs).await.unwrap();

    assert_eq!(session.preferences(), Some(prefs));
    let turns = session.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].content, GREETING);
    assert_eq!(open(&db).load_preferences().unwrap(), Some(prefs));
}

/// Provider whose first call waits until released
struct GatedProvider {
    gate: Arc<Notify>,
    opened: AtomicBool,
}

#[async_trait]
impl Provider for GatedProvider {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        if !self.opened.swap(true, Ordering::SeqCst) {
            self.gate.notified().await;
        }
        Ok(CompletionResponse::new(Message::assistant(DIRECT)))
    }
}

#[tokio::test]
async fn test_second_submission_while_busy_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(GatedProvider {
        gate: gate.clone(),
        opened: AtomicBool::new(false),
    });
    let session = session_with(provider, &tmp.path().join("state.db")).await;

    let release = async {
        tokio::task::yield_now().await;
        assert!(session.is_busy());
        gate.notify_one();
    };

    let (first, second, _) = tokio::join!(
        session.submit("first"),
        session.submit("second"),
        release
    );

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AizenError>(),
        Some(AizenError::SessionBusy)
    ));
    assert!(!session.is_busy());
}
