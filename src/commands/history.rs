use crate::agent::conversation::TurnRole;
use crate::cli::HistoryCommand;
use crate::error::Result;
use crate::storage::LocalStore;
use colored::Colorize;
use prettytable::{format, Table};

const PREVIEW_CHARS: usize = 60;

/// Handle history commands
pub fn handle_history(store: &LocalStore, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::Show { limit } => {
            let turns = store.load_history()?;

            if turns.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            let start = limit.map_or(0, |n| turns.len().saturating_sub(n));

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "Time".bold(),
                "Role".bold(),
                "Message".bold()
            ]);

            for turn in &turns[start..] {
                let role = match turn.role {
                    TurnRole::Error => turn.role.as_str().red(),
                    TurnRole::Assistant => turn.role.as_str().cyan(),
                    _ => turn.role.as_str().normal(),
                };
                table.add_row(prettytable::row![
                    turn.created_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M"),
                    role,
                    preview(&turn.content)
                ]);
            }

            println!("\nConversation History ({} turns):", turns.len());
            table.printstd();
            println!();
        }
        HistoryCommand::Clear => {
            store.clear_history()?;
            println!("{}", "Conversation history cleared.".green());
        }
    }

    Ok(())
}

/// First line of a message, shortened for table display
fn preview(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default();
    let mut preview: String = first_line.chars().take(PREVIEW_CHARS).collect();
    if first_line.chars().count() > PREVIEW_CHARS || content.lines().nth(1).is_some() {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::conversation::ChatTurn;
    use tempfile::tempdir;

    #[test]
    fn test_preview_shortens() {
        assert_eq!(preview("short"), "short");
        assert_eq!(preview("line one\nline two"), "line one...");
        let long = "x".repeat(100);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_clear_removes_history() {
        let dir = tempdir().unwrap();
        let store = LocalStore::new_with_path(dir.path().join("state.db")).unwrap();
        store.save_history(&[ChatTurn::user("hi")]).unwrap();

        handle_history(&store, HistoryCommand::Show { limit: Some(1) }).unwrap();
        handle_history(&store, HistoryCommand::Clear).unwrap();
        assert!(store.load_history().unwrap().is_empty());
    }
}
