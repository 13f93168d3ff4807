//! Special commands parser for interactive chat mode
//!
//! Commands are prefixed with `/`. The command word is case-insensitive;
//! arguments such as a haiku theme or a voice name keep their case.

use thiserror::Error;

/// Known command words, used for suggestions
const COMMAND_WORDS: &[&str] = &[
    "/haiku", "/clear", "/prefs", "/tts", "/voice", "/listen", "/help", "/exit", "/quit",
];

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {command}{}\n\nType '/help' to see available commands", suggestion_suffix(.suggestion))]
    UnknownCommand {
        /// What was typed
        command: String,
        /// Closest known command, if any is close enough
        suggestion: Option<String>,
    },

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument {
        /// Command word
        command: String,
        /// Offending argument
        arg: String,
    },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument {
        /// Command word
        command: String,
        /// Usage line
        usage: String,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean {}?)", s))
        .unwrap_or_default()
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Compose a haiku on the given theme
    Haiku(String),
    /// Clear the conversation
    Clear,
    /// Show current preferences
    ShowPrefs,
    /// Turn spoken replies on or off
    Tts(bool),
    /// Choose a voice; `None` restores the default
    Voice(Option<String>),
    /// Fill the input line from speech
    Listen,
    /// Display help information
    Help,
    /// Exit the interactive session
    Exit,
    /// Not a special command; send as a message
    None,
}

/// Closest known command word within a small edit distance
///
/// # Examples
///
/// ```
/// use aizen::commands::special_commands::suggest_command;
///
/// assert_eq!(suggest_command("/haiko").as_deref(), Some("/haiku"));
/// assert_eq!(suggest_command("/xyzzy"), None);
/// ```
pub fn suggest_command(word: &str) -> Option<String> {
    COMMAND_WORDS
        .iter()
        .map(|candidate| (candidate, strsim::levenshtein(word, candidate)))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate.to_string())
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError` for unknown commands, missing arguments, or
/// unsupported arguments.
///
/// # Examples
///
/// ```
/// use aizen::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(
///     parse_special_command("/haiku Autumn Moon").unwrap(),
///     SpecialCommand::Haiku("Autumn Moon".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (word, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match (word.as_str(), arg) {
        ("/haiku", "") => Err(CommandError::MissingArgument {
            command: "/haiku".to_string(),
            usage: "/haiku <theme>".to_string(),
        }),
        ("/haiku", theme) => Ok(SpecialCommand::Haiku(theme.to_string())),

        ("/clear", "") => Ok(SpecialCommand::Clear),
        ("/prefs", "") => Ok(SpecialCommand::ShowPrefs),

        ("/tts", "") => Err(CommandError::MissingArgument {
            command: "/tts".to_string(),
            usage: "/tts <on|off>".to_string(),
        }),
        ("/tts", arg) => match arg.to_lowercase().as_str() {
            "on" => Ok(SpecialCommand::Tts(true)),
            "off" => Ok(SpecialCommand::Tts(false)),
            _ => Err(CommandError::UnsupportedArgument {
                command: "/tts".to_string(),
                arg: arg.to_string(),
            }),
        },

        ("/voice", "") | ("/voice", "default") => Ok(SpecialCommand::Voice(None)),
        ("/voice", name) => Ok(SpecialCommand::Voice(Some(name.to_string()))),

        ("/listen", "") => Ok(SpecialCommand::Listen),
        ("/help", "") | ("/?", "") => Ok(SpecialCommand::Help),
        ("/exit", "") | ("/quit", "") => Ok(SpecialCommand::Exit),

        (known, arg) if COMMAND_WORDS.contains(&known) => Err(CommandError::UnsupportedArgument {
            command: known.to_string(),
            arg: arg.to_string(),
        }),

        (unknown, _) => Err(CommandError::UnknownCommand {
            command: unknown.to_string(),
            suggestion: suggest_command(unknown),
        }),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands
================

  /haiku <theme>  - Ask Aizen for a 5-7-5 haiku on a theme
  /clear          - Clear the conversation
  /prefs          - Show your answer preferences
  /tts on|off     - Speak Aizen's replies aloud
  /voice [name]   - Choose the speaking voice (no name restores the default)
  /listen         - Dictate a message (requires speech.stt_command)
  /help           - Show this help message
  /exit           - Leave the conversation (also: exit, quit)

Preferences can be changed with `aizen prefs set`.
"#
    );
}
