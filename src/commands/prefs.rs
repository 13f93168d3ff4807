use crate::cli::PrefsCommand;
use crate::error::{AizenError, Result};
use crate::preferences::{AnswerLength, PhilosophicalInterest, Tone, UserPreferences};
use crate::storage::LocalStore;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle preference commands
pub fn handle_prefs(store: &LocalStore, command: PrefsCommand) -> Result<()> {
    match command {
        PrefsCommand::Show => {
            let stored = store.load_preferences()?;
            let prefs = stored.unwrap_or_default();

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row!["Tone".bold(), prefs.tone]);
            table.add_row(prettytable::row!["Answer length".bold(), prefs.answer_length]);
            table.add_row(prettytable::row![
                "Bushido philosophy".bold(),
                prefs.philosophical_interest
            ]);
            table.printstd();

            if stored.is_none() {
                println!("{}", "No preferences saved; showing defaults.".dimmed());
            }
        }
        PrefsCommand::Set {
            tone,
            length,
            philosophy,
        } => {
            let updated = apply_updates(
                store.load_preferences()?.unwrap_or_default(),
                tone.as_deref(),
                length.as_deref(),
                philosophy.as_deref(),
            )?;
            store.save_preferences(&updated)?;
            store.set_onboarding_complete(true)?;
            tracing::info!(%updated, "Preferences updated");
            println!("{} {}", "Preferences saved:".green(), updated);
        }
    }

    Ok(())
}

/// Apply the given changes to existing preferences
///
/// # Errors
///
/// Returns `AizenError::Config` naming the first value that does not parse.
pub fn apply_updates(
    mut prefs: UserPreferences,
    tone: Option<&str>,
    length: Option<&str>,
    philosophy: Option<&str>,
) -> Result<UserPreferences> {
    if let Some(tone) = tone {
        prefs.tone = Tone::parse_str(tone).map_err(AizenError::Config)?;
    }
    if let Some(length) = length {
        prefs.answer_length = AnswerLength::parse_str(length).map_err(AizenError::Config)?;
    }
    if let Some(philosophy) = philosophy {
        prefs.philosophical_interest =
            PhilosophicalInterest::parse_str(philosophy).map_err(AizenError::Config)?;
    }
    Ok(prefs)
}
