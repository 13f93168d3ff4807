/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`    - Interactive conversation
- `ask`     - One-shot turn
- `haiku`   - One-shot haiku
- `auth`    - Store the Gemini API key in the system keyring
- `history` - Inspect or clear the stored conversation
- `prefs`   - Inspect or change answer preferences
*/

use crate::agent::conversation::{ChatTurn, TurnKind, TurnRole};
use crate::config::Config;
use crate::error::Result;
use crate::service::AizenService;
use crate::storage::LocalStore;
use colored::Colorize;
use std::sync::Arc;

// Special commands parser for the interactive chat
pub mod special_commands;

// Stored conversation inspection
pub mod history;

// Preference inspection and editing
pub mod prefs;

/// Print one conversation turn
pub fn print_turn(turn: &ChatTurn) {
    match (turn.role, turn.kind) {
        (TurnRole::User, _) => println!("{} {}", "you:".bold(), turn.content),
        (TurnRole::Assistant, TurnKind::Haiku) => {
            println!("{}", "aizen:".cyan().bold());
            for line in turn.content.lines() {
                println!("    {}", line.italic().cyan());
            }
        }
        (TurnRole::Assistant, TurnKind::Plain) => {
            println!("{} {}", "aizen:".cyan().bold(), turn.content)
        }
        (TurnRole::SystemStatus, _) => println!("{}", turn.content.dimmed()),
        (TurnRole::Error, _) => println!("{} {}", "aizen:".red().bold(), turn.content.red()),
    }
}

fn build_service(config: &Config) -> Result<Arc<AizenService>> {
    Ok(Arc::new(AizenService::from_config(config)?))
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Restores the session, runs onboarding when it has not happened yet,
    //! and then reads lines with rustyline until `/exit`.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::agent::session::{haiku_status, ChatSession, THINKING_STATUS};
    use crate::preferences::{AnswerLength, PhilosophicalInterest, Tone, UserPreferences};
    use crate::speech::{recognizer_from_config, synthesizer_from_config, TranscriptComposer};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    const PROMPT: &str = "you> ";

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `store` - Local state store
    pub async fn run_chat(config: Config, store: LocalStore) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let service = build_service(&config)?;
        let mut speech_config = config.speech.clone();
        let stored_tts = store.load_tts_settings()?;
        if stored_tts.voice.is_some() {
            speech_config.voice = stored_tts.voice;
        }

        let session = ChatSession::load(service, store, config.agent.history_window)
            .await?
            .with_synthesizer(synthesizer_from_config(&speech_config));

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner();
        if !session.onboarding_complete() {
            run_onboarding(&mut rl, &session).await?;
        }
        for turn in session.turns() {
            print_turn(&turn);
        }

        let mut pending: Option<String> = None;

        loop {
            let read = match pending.take() {
                Some(initial) => rl.readline_with_initial(PROMPT, (initial.as_str(), "")),
                None => rl.readline(PROMPT),
            };

            let line = match read {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted. Type /exit to leave.");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    return Err(e.into());
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            rl.add_history_entry(trimmed)?;

            let command = match parse_special_command(trimmed) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}", e.to_string().yellow());
                    continue;
                }
            };

            match command {
                SpecialCommand::Haiku(theme) => {
                    println!("{}", haiku_status(&theme).dimmed());
                    print_added(session.generate_haiku(&theme).await);
                }
                SpecialCommand::Clear => {
                    session.clear().await?;
                    println!("{}", "Chat cleared.".green());
                    if let Some(turn) = session.turns().last() {
                        print_turn(turn);
                    }
                }
                SpecialCommand::ShowPrefs => match session.preferences() {
                    Some(prefs) => println!("Preferences: {}", prefs.to_string().cyan()),
                    None => println!(
                        "No preferences saved; defaults apply ({}).",
                        UserPreferences::default()
                    ),
                },
                SpecialCommand::Tts(enabled) => {
                    session.set_tts_enabled(enabled).await?;
                    println!("Spoken replies {}", if enabled { "on" } else { "off" });
                }
                SpecialCommand::Voice(voice) => {
                    let label = voice.clone().unwrap_or_else(|| "default".to_string());
                    session.set_voice(voice).await?;
                    println!("Voice set to {}", label.cyan());
                }
                SpecialCommand::Listen => {
                    pending = listen(&config).await;
                }
                SpecialCommand::Help => print_help(),
                SpecialCommand::Exit => break,
                SpecialCommand::None => {
                    println!("{}", THINKING_STATUS.dimmed());
                    print_added(session.submit(trimmed).await);
                }
            }
        }

        println!("May your path be clear. Farewell.");
        Ok(())
    }

    fn print_added(result: Result<Vec<ChatTurn>>) {
        match result {
            Ok(turns) => turns.iter().for_each(print_turn),
            Err(e) => println!("{}", e.to_string().yellow()),
        }
    }

    async fn listen(config: &Config) -> Option<String> {
        let Some(recognizer) = recognizer_from_config(&config.speech) else {
            println!(
                "{}",
                "Voice input needs speech.stt_command in the configuration.".yellow()
            );
            return None;
        };

        let mut events = match recognizer.listen().await {
            Ok(events) => events,
            Err(e) => {
                println!("{}", format!("Could not start speech recognition: {}", e).red());
                return None;
            }
        };

        println!("{}", "Listening...".dimmed());
        let mut transcript = TranscriptComposer::new("");
        while let Some(event) = events.recv().await {
            transcript.apply(&event);
            if transcript.is_finished() {
                break;
            }
            println!("{}", transcript.text().dimmed());
        }

        if let Some(code) = transcript.error() {
            println!("{}", code.user_message().red());
        }
        let text = transcript.text();
        (!text.is_empty()).then_some(text)
    }

    async fn run_onboarding(rl: &mut DefaultEditor, session: &ChatSession) -> Result<()> {
        println!("Before we begin, tell me how you prefer to be answered.");
        println!("{}", "Press Enter at any question to skip.".dimmed());

        let tone = ask(rl, "Tone (formal, guiding, concise): ", Tone::parse_str)?;
        let Some(tone) = tone else {
            return session.skip_onboarding().await;
        };
        let length = ask(rl, "Answer length (detailed, moderate, brief): ", AnswerLength::parse_str)?
            .unwrap_or_default();
        let philosophy = ask(
            rl,
            "Interest in Bushido philosophy (high, moderate, low): ",
            PhilosophicalInterest::parse_str,
        )?
        .unwrap_or_default();

        session
            .save_preferences(UserPreferences::new(tone, length, philosophy))
            .await?;
        println!("{}", "Preferences saved.".green());
        Ok(())
    }

    fn ask<T>(
        rl: &mut DefaultEditor,
        prompt: &str,
        parse: fn(&str) -> std::result::Result<T, String>,
    ) -> Result<Option<T>> {
        loop {
            let line = match rl.readline(prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            if line.trim().is_empty() {
                return Ok(None);
            }
            match parse(&line) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => println!("{}", e.yellow()),
            }
        }
    }

    fn print_welcome_banner() {
        println!("{}", "Aizen".cyan().bold());
        println!(
            "{}",
            "Type a message, or /help for commands. /exit leaves.".dimmed()
        );
        println!();
    }
}

// One-shot turn handler
pub mod ask {
    //! Sends a single message and prints the response(s).

    use super::*;
    use crate::service::{TurnRequest, TurnResponse};

    /// Run one turn outside the interactive session
    ///
    /// Uses stored preferences but neither reads nor writes the stored
    /// conversation.
    ///
    /// # Errors
    ///
    /// Returns the persona-styled error message when the turn fails.
    pub async fn run_ask(config: Config, store: &LocalStore, message: String) -> Result<()> {
        let service = build_service(&config)?;
        let request = TurnRequest {
            message,
            chat_history: Vec::new(),
            preferences: store.load_preferences()?,
        };

        match service.submit_turn(request).await {
            TurnResponse::Responses { responses } => {
                for response in responses {
                    println!("{}", response);
                }
                Ok(())
            }
            TurnResponse::Error { error } => Err(anyhow::anyhow!(error)),
        }
    }
}

// One-shot haiku handler
pub mod haiku {
    //! Composes a single haiku and prints it.

    use super::*;
    use crate::service::HaikuResponse;

    /// Compose and print a haiku
    ///
    /// # Errors
    ///
    /// Returns the persona-styled error message when composition fails.
    pub async fn run_haiku(config: Config, theme: String) -> Result<()> {
        let service = build_service(&config)?;
        match service.generate_haiku(&theme).await {
            HaikuResponse::Haiku { haiku } => {
                println!("{}", haiku);
                Ok(())
            }
            HaikuResponse::Error { error } => Err(anyhow::anyhow!(error)),
        }
    }
}

// Credential storage handler
pub mod auth {
    //! Stores the Gemini API key in the system keyring.

    use super::*;
    use rustyline::DefaultEditor;

    /// Store the API key, prompting for it when not given
    pub fn run_auth(api_key: Option<String>) -> Result<()> {
        let key = match api_key {
            Some(key) => key,
            None => {
                let mut rl = DefaultEditor::new()?;
                rl.readline("Gemini API key: ")?
            }
        };

        crate::credentials::store_api_key(&key)?;
        println!("{}", "API key stored in the system keyring.".green());
        Ok(())
    }
}
