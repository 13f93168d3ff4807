use aizen::config::Config;
use aizen::error::{AizenError, Result};
use aizen::providers::{CompletionResponse, FunctionCall, Message, Provider, ToolCall};
use aizen::storage::LocalStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (LocalStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("state.db");
    let store = LocalStore::new_with_path(db_path).expect("failed to create local store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Configuration with a usable Gemini key
#[allow(dead_code)]
pub fn keyed_config() -> Config {
    let mut config = Config::default();
    config.provider.gemini.api_key = Some("integration-key".to_string());
    config
}

#[allow(dead_code)]
#[derive(Debug)]
enum Reply {
    Text(String),
    ToolCall(String, String),
    Fail(String),
}

/// Provider that replays a fixed script and records what it was sent
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FakeProvider {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Text(text.to_string()));
        self
    }

    pub fn tool_call(self, name: &str, arguments: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::ToolCall(name.to_string(), arguments.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Fail(message.to_string()));
        self
    }

    /// Messages of every call, in order
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(CompletionResponse::new(Message::assistant(text))),
            Some(Reply::ToolCall(name, arguments)) => Ok(CompletionResponse::new(
                Message::assistant_with_tools(vec![ToolCall {
                    id: "call_1".to_string(),
                    function: FunctionCall { name, arguments },
                }]),
            )),
            Some(Reply::Fail(message)) => Err(AizenError::Provider(message).into()),
            None => Err(AizenError::Provider("no scripted reply left".to_string()).into()),
        }
    }
}
