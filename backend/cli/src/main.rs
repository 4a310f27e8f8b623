mod config_cmd;
mod history_cmd;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use grokgram_agent::{
    AgentSettings, ChatAgent, Placeholders, SessionCoordinator, WindowPolicy,
    DEFAULT_CLEARED_REPLY, DEFAULT_FALLBACK_REPLY, DEFAULT_SYSTEM_DIRECTIVE,
};
use grokgram_channels::{ChannelAdapter, TelegramAdapter};
use grokgram_config::{load_and_prepare, redact, resolve_config_path, BotConfig, LoggingSection};
use grokgram_logging::{init_logger, LogOptions};
use grokgram_memory::{HistoryStore, SqliteHistoryStore};
use grokgram_providers::GrokProvider;

use history_cmd::HistoryCommands;

#[derive(Parser)]
#[command(name = "grokgram")]
#[command(about = "grokgram: Telegram bot answering through Grok with bounded per-chat memory")]
#[command(version)]
struct Cli {
    /// Config file (overrides CONFIG_PATH)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Validate the config file and print it with secrets masked
    CheckConfig,
    /// Inspect or clear stored conversation histories
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config_path).await,
        Commands::CheckConfig => config_cmd::run(&config_path).await,
        Commands::History { action } => history_cmd::run(&config_path, action).await,
    }
}

pub(crate) fn log_options(logging: &LoggingSection) -> LogOptions {
    LogOptions {
        level: logging.level.clone(),
        debug: logging.debug,
        json: logging.json,
        dir: logging.dir.clone(),
    }
}

/// Coordinator that opens the SQLite store at `db.path` on first use.
pub(crate) fn sessions_for(config: &BotConfig) -> SessionCoordinator {
    let path = config.db.path.clone();
    let max_history = config.session.max_history;
    SessionCoordinator::lazy(move || {
        let store = SqliteHistoryStore::open(&path)?.with_max_history(max_history);
        Ok(Arc::new(store) as Arc<dyn HistoryStore>)
    })
}

async fn run_bot(config_path: PathBuf) -> Result<()> {
    let (config, report) = load_and_prepare(&config_path).await?;
    init_logger(&log_options(&config.logging))?;
    for warning in &report.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    debug!(config = %redact(&config), "Effective configuration");

    info!(
        config = %config_path.display(),
        db = %config.db.path.display(),
        model = %config.grok.model,
        "Starting grokgram"
    );

    // Open the store before taking traffic; a broken database is fatal.
    let sessions = Arc::new(sessions_for(&config));
    sessions
        .ensure_ready()
        .await
        .context("Failed to init history store")?;

    let mut provider = GrokProvider::with_timeout(
        config.grok.api_key.clone(),
        Duration::from_secs(config.grok.timeout_secs),
    )?;
    if let Some(url) = &config.grok.api_url {
        provider = provider.with_api_url(url.clone());
    }

    let session = &config.session;
    let agent = Arc::new(ChatAgent::new(
        sessions,
        Arc::new(provider),
        Placeholders::random(session.placeholders.clone()),
        WindowPolicy {
            system_directive: config
                .grok
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_DIRECTIVE.to_string()),
            max_context_messages: session.max_context_messages,
        },
        AgentSettings {
            bot_username: config.bot.username.clone(),
            model: config.grok.model.clone(),
            max_tokens: config.grok.max_tokens,
            temperature: config.grok.temperature,
            fallback_reply: session
                .fallback_reply
                .clone()
                .unwrap_or_else(|| DEFAULT_FALLBACK_REPLY.to_string()),
            cleared_reply: session
                .cleared_reply
                .clone()
                .unwrap_or_else(|| DEFAULT_CLEARED_REPLY.to_string()),
        },
    ));

    let adapter = TelegramAdapter::new(config.bot.token.clone());
    info!(channel = adapter.name(), "Channel adapter starting");
    adapter.start(agent).await
}
