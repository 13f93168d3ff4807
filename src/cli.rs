//! Command-line interface definition for Aizen
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions, haiku
//! composition, credential storage, history, and preferences.

use clap::{Parser, Subcommand};

/// Aizen - a conversational assistant guided by Bushido principles
#[derive(Parser, Debug, Clone)]
#[command(name = "aizen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Override the local state database path
    #[arg(long, env = "AIZEN_STATE_DB")]
    pub state_db: Option<String>,

    /// Override the provider from config (gemini, ollama)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Aizen
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive conversation
    Chat,

    /// Ask a single question and print the response(s)
    Ask {
        /// The message to send
        message: String,
    },

    /// Compose a haiku on a theme
    Haiku {
        /// Theme for the haiku
        theme: String,
    },

    /// Store the Gemini API key in the system keyring
    Auth {
        /// API key; prompted for when omitted
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Inspect or clear the stored conversation
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Inspect or change answer preferences
    Prefs {
        /// Preferences subcommand
        #[command(subcommand)]
        command: PrefsCommand,
    },
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// Print the stored conversation
    Show {
        /// Only show the most recent N turns
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete the stored conversation
    Clear,
}

/// Preference subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PrefsCommand {
    /// Print the current preferences
    Show,

    /// Update one or more preferences
    Set {
        /// Tone: formal, guiding, concise
        #[arg(long)]
        tone: Option<String>,

        /// Answer length: detailed, moderate, brief
        #[arg(long)]
        length: Option<String>,

        /// Interest in Bushido philosophy: high, moderate, low
        #[arg(long)]
        philosophy: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
