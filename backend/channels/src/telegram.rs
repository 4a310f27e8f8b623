use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use grokgram_agent::{ChatAgent, Inbound, ReplySink, SentMessage, TurnOutcome};
use grokgram_core::{BotError, ConversationId};
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{Me, MessageId, ParseMode};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::ChannelAdapter;

pub struct TelegramAdapter {
    bot: Bot,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

/// Sends and edits messages through the Bot API.
pub struct TelegramSink {
    bot: Bot,
}

fn transport_err(err: impl std::fmt::Display) -> BotError {
    BotError::Transport(err.to_string())
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn send(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<SentMessage, BotError> {
        let sent = self
            .bot
            .send_message(ChatId(conversation.0), text)
            .await
            .map_err(transport_err)?;
        Ok(SentMessage(sent.id.0))
    }

    async fn edit(
        &self,
        conversation: ConversationId,
        message: SentMessage,
        text: &str,
    ) -> Result<(), BotError> {
        let chat = ChatId(conversation.0);
        let id = MessageId(message.0);
        let markdown = self
            .bot
            .edit_message_text(chat, id, text)
            .parse_mode(ParseMode::Markdown)
            .await;

        if let Err(e) = markdown {
            // Model output is not always valid Telegram Markdown.
            warn!(error = %e, "Markdown edit rejected; sending plain text");
            self.bot
                .edit_message_text(chat, id, text)
                .await
                .map_err(transport_err)?;
        }
        Ok(())
    }
}

/// Strip a Telegram message down to what the agent needs.
fn inbound_from(msg: &Message, me: &Me) -> Option<Inbound> {
    let text = msg.text()?;
    let reply_to_bot = msg
        .reply_to_message()
        .filter(|reply| reply.from.as_ref().is_some_and(|user| user.id == me.id))
        .map(|reply| reply.text().unwrap_or_default().to_string());

    Some(Inbound {
        conversation: ConversationId(msg.chat.id.0),
        text: text.to_string(),
        reply_to_bot,
    })
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self, agent: Arc<ChatAgent>) -> anyhow::Result<()> {
        let me = self
            .bot
            .get_me()
            .await
            .context("Telegram API error: getMe failed")?;
        info!(username = %me.username(), "Authorized on Telegram");

        let sink = Arc::new(TelegramSink {
            bot: self.bot.clone(),
        });

        // Updates are dispatched per chat: one chat's turns run in order,
        // different chats run concurrently.
        let handler = Update::filter_message().endpoint(
            |msg: Message,
             me: Me,
             agent: Arc<ChatAgent>,
             sink: Arc<TelegramSink>,
             fatal: Arc<Notify>| async move {
                if let Some(inbound) = inbound_from(&msg, &me) {
                    match agent.handle(inbound, sink.as_ref()).await {
                        Ok(TurnOutcome::Replied { recorded: false }) => {
                            warn!(chat_id = msg.chat.id.0, "Reply sent but not saved to history");
                        }
                        Ok(outcome) => debug!(chat_id = msg.chat.id.0, ?outcome, "Turn finished"),
                        Err(e) if e.is_fatal() => {
                            error!(chat_id = msg.chat.id.0, error = %e, "Fatal error; stopping");
                            fatal.notify_one();
                        }
                        Err(e) => error!(chat_id = msg.chat.id.0, error = %e, "Turn failed"),
                    }
                }
                respond(())
            },
        );

        let fatal = Arc::new(Notify::new());
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![me, Arc::clone(&agent), sink, Arc::clone(&fatal)])
            .enable_ctrlc_handler()
            .build();

        // A fatal turn error stops polling after in-flight updates finish.
        let shutdown = dispatcher.shutdown_token();
        let watcher = tokio::spawn(async move {
            fatal.notified().await;
            if let Ok(done) = shutdown.shutdown() {
                done.await;
            }
        });
        dispatcher.dispatch().await;
        watcher.abort();

        info!("Telegram dispatcher stopped");
        // The store stays unavailable after a failed open, so this reports why we stopped.
        agent
            .sessions()
            .ensure_ready()
            .await
            .context("History store unavailable")?;
        Ok(())
    }
}
