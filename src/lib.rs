//! Aizen - persona-driven conversational assistant library
//!
//! This library provides the core functionality for Aizen, a calm,
//! Bushido-inspired assistant that answers questions, looks things up,
//! tells the time, and composes haiku.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Capability assessment, turn orchestration, response composition, and the chat session
//! - `providers`: Language model provider abstraction and implementations (Gemini, Ollama)
//! - `tools`: Internet search, calculator, and clock tools with their registry
//! - `service`: Request/response surface used by the session and the CLI
//! - `storage`: Local key-value persistence of conversation and preferences
//! - `speech`: Spoken replies and dictated input
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use aizen::service::TurnRequest;
//! use aizen::{AizenService, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &aizen::cli::Cli::parse_args())?;
//!     config.validate()?;
//!
//!     let service = AizenService::from_config(&config)?;
//!     let response = service
//!         .submit_turn(TurnRequest {
//!             message: "What is the way of the warrior?".to_string(),
//!             ..Default::default()
//!         })
//!         .await;
//!     println!("{:?}", response);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod preferences;
pub mod prompts;
pub mod providers;
pub mod service;
pub mod speech;
pub mod storage;
pub mod tools;

// Re-export commonly used types
pub use agent::{ChatSession, TurnOrchestrator};
pub use config::Config;
pub use error::{AizenError, Result};
pub use preferences::UserPreferences;
pub use service::AizenService;
pub use storage::LocalStore;

#[cfg(test)]
pub mod test_utils;
