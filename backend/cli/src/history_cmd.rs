//! `grokgram history` subcommands
//!
//! Operate directly on the history database named by `db.path`.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::Path;

use grokgram_config::load_config;
use grokgram_core::ConversationId;
use grokgram_logging::init_logger;

use crate::{log_options, sessions_for};

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List chats that have stored history
    List,
    /// Print the stored replies of a chat, oldest first
    Show {
        #[arg(allow_negative_numbers = true)]
        chat: ConversationId,
    },
    /// Forget everything stored for a chat
    Clear {
        #[arg(allow_negative_numbers = true)]
        chat: ConversationId,
    },
}

pub async fn run(config_path: &Path, cmd: HistoryCommands) -> Result<()> {
    // Credentials are not needed here, so the config is not validated.
    let config = load_config(config_path).await?;
    init_logger(&log_options(&config.logging))?;
    let sessions = sessions_for(&config);
    sessions
        .ensure_ready()
        .await
        .with_context(|| format!("Cannot open {}", config.db.path.display()))?;

    match cmd {
        HistoryCommands::List => {
            let ids = sessions.conversations().await?;
            if ids.is_empty() {
                println!("No stored conversations.");
            }
            for id in ids {
                let len = sessions.get_history(id).await?.len();
                println!("  {id}: {len} entries");
            }
        }
        HistoryCommands::Show { chat } => {
            let history = sessions.get_history(chat).await?;
            println!("History for chat {chat} ({} entries):", history.len());
            for (i, entry) in history.iter().enumerate() {
                println!("--- [{}] ---\n{entry}", i + 1);
            }
        }
        HistoryCommands::Clear { chat } => {
            sessions.reset_session(chat).await?;
            println!("Cleared history for chat {chat}");
        }
    }
    Ok(())
}
