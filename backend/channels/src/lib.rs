use std::sync::Arc;

use async_trait::async_trait;
use grokgram_agent::ChatAgent;

pub mod telegram;

pub use telegram::TelegramAdapter;

/// All channel adapters implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Receive messages and hand each one to `agent` until shutdown.
    async fn start(&self, agent: Arc<ChatAgent>) -> anyhow::Result<()>;
}
