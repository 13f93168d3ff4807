//! Settings for Aizen, read from YAML and layered with environment
//! variables and command-line flags

use crate::error::{AizenError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the binary can be told from outside
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider configuration (Gemini, Ollama)
    pub provider: ProviderConfig,
    /// Turn orchestration settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Speech input/output settings
    #[serde(default)]
    pub speech: SpeechConfig,
}

/// Which model backend answers, and how to reach each one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use ("gemini" or "ollama")
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Hosted Gemini backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; usually supplied through `GOOGLE_API_KEY` or the keyring
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API base URL (overridable for tests and proxies)
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Self-hosted Ollama backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the server, without `/api`
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Limits applied while a turn is being answered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Number of most recent turns forwarded to the response composer
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Maximum provider round-trips the composer may spend on tool calls
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_history_window() -> usize {
    10
}

fn default_max_tool_rounds() -> usize {
    4
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

/// Knobs for the built-in tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// strftime-style format used by the clock tool
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// Default IANA timezone for the clock tool (local time when unset)
    #[serde(default)]
    pub timezone: Option<String>,

    /// Maximum size of a tool answer forwarded to the model (bytes)
    #[serde(default = "default_max_output")]
    pub max_output_size: usize,
}

fn default_time_format() -> String {
    "%-I:%M:%S %p".to_string()
}

fn default_max_output() -> usize {
    8_192
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            timezone: None,
            max_output_size: default_max_output(),
        }
    }
}

/// Speech input/output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpeechConfig {
    /// Text-to-speech program (defaults to `say` on macOS, `espeak` elsewhere)
    #[serde(default)]
    pub tts_command: Option<String>,

    /// Speech-to-text program; each stdout line is a finalized transcript segment
    #[serde(default)]
    pub stt_command: Option<String>,

    /// Preferred voice name passed to the TTS program
    #[serde(default)]
    pub voice: Option<String>,
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    AizenError::Config(message.into()).into()
}

/// Reads `name`, treating an unset or non-unicode variable as absent
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl Config {
    /// File settings, then `AIZEN_*`/`GOOGLE_API_KEY` variables, then flags
    ///
    /// A missing file is not an error; built-in defaults are used instead.
    ///
    /// # Errors
    ///
    /// The file exists but cannot be read or is not valid YAML.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| invalid(format!("Failed to read config file: {}", e)))?;
            serde_yaml::from_str(&raw)
                .map_err(|e| invalid(format!("Failed to parse config: {}", e)))?
        } else {
            tracing::warn!(path, "No config file, falling back to defaults");
            Self::default()
        };

        config.merge_env();
        if let Some(provider) = &cli.provider {
            tracing::debug!(provider = %provider, "Provider chosen on the command line");
            config.provider.provider_type = provider.clone();
        }

        Ok(config)
    }

    fn merge_env(&mut self) {
        let gemini = &mut self.provider.gemini;
        let ollama = &mut self.provider.ollama;

        if let Some(kind) = env_value("AIZEN_PROVIDER") {
            self.provider.provider_type = kind;
        }
        if let Some(key) = env_value("GOOGLE_API_KEY") {
            gemini.api_key = Some(key);
        }
        if let Some(model) = env_value("AIZEN_GEMINI_MODEL") {
            gemini.model = model;
        }
        if let Some(host) = env_value("AIZEN_OLLAMA_HOST") {
            ollama.host = host;
        }
        if let Some(model) = env_value("AIZEN_OLLAMA_MODEL") {
            ollama.model = model;
        }
        if let Some(window) = env_value("AIZEN_HISTORY_WINDOW") {
            match window.parse() {
                Ok(turns) => self.agent.history_window = turns,
                Err(_) => tracing::warn!("Ignoring AIZEN_HISTORY_WINDOW={}", window),
            }
        }
        if let Some(zone) = env_value("AIZEN_TIMEZONE") {
            self.tools.timezone = Some(zone);
        }
    }

    /// Reject settings the rest of the program cannot work with
    ///
    /// An absent API key passes: every turn then answers with the fixed
    /// configuration message instead.
    pub fn validate(&self) -> Result<()> {
        const PROVIDERS: [&str; 2] = ["gemini", "ollama"];

        let kind = self.provider.provider_type.as_str();
        if kind.is_empty() {
            return Err(invalid("Provider type cannot be empty"));
        }
        if !PROVIDERS.contains(&kind) {
            return Err(invalid(format!(
                "Invalid provider type: {}. Must be one of: {}",
                kind,
                PROVIDERS.join(", ")
            )));
        }
        if self.agent.history_window == 0 {
            return Err(invalid("agent.history_window must be greater than 0"));
        }
        if !(1..=16).contains(&self.agent.max_tool_rounds) {
            return Err(invalid("agent.max_tool_rounds must be between 1 and 16"));
        }
        if self.tools.time_format.trim().is_empty() {
            return Err(invalid("tools.time_format cannot be empty"));
        }
        if self.tools.max_output_size == 0 {
            return Err(invalid("tools.max_output_size must be greater than 0"));
        }
        if self.provider.gemini.timeout_secs == 0 || self.provider.ollama.timeout_secs == 0 {
            return Err(invalid("provider timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "gemini".to_string(),
                gemini: GeminiConfig::default(),
                ollama: OllamaConfig::default(),
            },
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}
