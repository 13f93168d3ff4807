//! Aizen - persona-driven conversational assistant CLI
//!
#![doc = "Aizen - persona-driven conversational assistant CLI"]
#![doc = "Main entry point for the Aizen application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aizen::cli::{Cli, Commands};
use aizen::commands;
use aizen::config::Config;
use aizen::storage::LocalStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let mut config = Config::load(config_path, &cli)?;

    // Keyring lookup only matters for commands that talk to the model
    if matches!(
        cli.command,
        Commands::Chat | Commands::Ask { .. } | Commands::Haiku { .. }
    ) {
        aizen::credentials::resolve_api_key(&mut config);
    }

    // Validate configuration
    config.validate()?;

    let store = || match &cli.state_db {
        Some(path) => {
            tracing::debug!("Using state DB override: {}", path);
            LocalStore::new_with_path(path)
        }
        None => LocalStore::new(),
    };

    // Execute command
    match cli.command.clone() {
        Commands::Chat => {
            commands::chat::run_chat(config, store()?).await?;
            Ok(())
        }
        Commands::Ask { message } => {
            tracing::info!("Answering a single message");
            commands::ask::run_ask(config, &store()?, message).await?;
            Ok(())
        }
        Commands::Haiku { theme } => {
            tracing::info!(theme = %theme, "Composing a haiku");
            commands::haiku::run_haiku(config, theme).await?;
            Ok(())
        }
        Commands::Auth { api_key } => {
            tracing::info!("Storing Gemini API key");
            commands::auth::run_auth(api_key)?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(&store()?, command)?;
            Ok(())
        }
        Commands::Prefs { command } => {
            commands::prefs::handle_prefs(&store()?, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so replies on stdout stay clean.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "aizen=debug" } else { "aizen=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
