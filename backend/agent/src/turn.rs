//! One conversation turn: classify the inbound message, build the context
//! window, call the completion provider, and deliver the reply.

use std::sync::Arc;

use async_trait::async_trait;
use grokgram_core::{BotError, CompletionProvider, CompletionRequest, ConversationId};
use tracing::{debug, error, info, instrument, warn};

use crate::context_window::{ContextWindow, WindowPolicy};
use crate::placeholder::Placeholders;
use crate::session::SessionCoordinator;

const FORGET_COMMAND: &str = "/forget";

pub const DEFAULT_FALLBACK_REPLY: &str = "Sorry, I can't reach Grok right now. Try again later.";
pub const DEFAULT_CLEARED_REPLY: &str = "Context cleared.";

/// A text message as seen by the agent, stripped of transport details.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub conversation: ConversationId,
    pub text: String,
    /// Text of the bot message this one replies to, if it replies to the bot.
    pub reply_to_bot: Option<String>,
}

/// What an inbound message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Forget,
    /// Mention without a reply: start a fresh thread.
    Mention,
    /// Reply to one of the bot's messages; `previous` is that message's text.
    Reply { previous: String },
    Ignore,
}

impl Trigger {
    pub fn classify(inbound: &Inbound, bot_username: &str) -> Self {
        let text = inbound.text.as_str();
        if text.is_empty() {
            return Self::Ignore;
        }
        if text.starts_with(FORGET_COMMAND) {
            return Self::Forget;
        }
        if let Some(previous) = &inbound.reply_to_bot {
            return Self::Reply {
                previous: previous.clone(),
            };
        }
        let handle = format!("@{}", bot_username.trim_start_matches('@').to_lowercase());
        if !bot_username.is_empty() && text.to_lowercase().contains(&handle) {
            return Self::Mention;
        }
        Self::Ignore
    }

    /// Prompt sent to the provider for this trigger.
    pub fn prompt(&self, text: &str) -> String {
        match self {
            Self::Reply { previous } if !previous.is_empty() => {
                format!("Previous answer: {previous}\nNew question: {text}")
            }
            _ => text.to_string(),
        }
    }
}

/// Handle of a message the bot sent, used to edit it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage(pub i32);

/// Outbound side of the chat transport.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, conversation: ConversationId, text: &str) -> Result<SentMessage, BotError>;

    /// Replace the text of a sent message. The text may contain Markdown.
    async fn edit(
        &self,
        conversation: ConversationId,
        message: SentMessage,
        text: &str,
    ) -> Result<(), BotError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Ignored,
    Cleared,
    /// The reply was delivered; `recorded` is false if writing it to history failed.
    Replied { recorded: bool },
    /// The provider failed and the fallback text was shown instead.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub bot_username: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub fallback_reply: String,
    pub cleared_reply: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            bot_username: String::new(),
            model: "grok-3".to_string(),
            max_tokens: None,
            temperature: None,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            cleared_reply: DEFAULT_CLEARED_REPLY.to_string(),
        }
    }
}

pub struct ChatAgent {
    sessions: Arc<SessionCoordinator>,
    provider: Arc<dyn CompletionProvider>,
    placeholders: Placeholders,
    window: WindowPolicy,
    settings: AgentSettings,
}

impl ChatAgent {
    pub fn new(
        sessions: Arc<SessionCoordinator>,
        provider: Arc<dyn CompletionProvider>,
        placeholders: Placeholders,
        window: WindowPolicy,
        settings: AgentSettings,
    ) -> Self {
        Self {
            sessions,
            provider,
            placeholders,
            window,
            settings,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionCoordinator> {
        &self.sessions
    }

    /// Drive one turn to completion.
    ///
    /// Errors are returned when the store is unavailable, when `/forget`
    /// could not clear, or when the placeholder could not be sent. A reply
    /// that reached the user but could not be stored is reported through
    /// [`TurnOutcome::Replied`].
    #[instrument(skip_all, fields(conversation = %inbound.conversation))]
    pub async fn handle(
        &self,
        inbound: Inbound,
        sink: &dyn ReplySink,
    ) -> Result<TurnOutcome, BotError> {
        let id = inbound.conversation;
        let trigger = Trigger::classify(&inbound, &self.settings.bot_username);
        debug!(?trigger, "Classified inbound message");

        match &trigger {
            Trigger::Ignore => return Ok(TurnOutcome::Ignored),
            Trigger::Forget => {
                self.sessions.reset_session(id).await?;
                sink.send(id, &self.settings.cleared_reply).await?;
                info!("Conversation cleared on request");
                return Ok(TurnOutcome::Cleared);
            }
            Trigger::Mention => {
                if let Err(e) = self.sessions.reset_session(id).await {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    warn!(error = %e, "Could not start a fresh thread; keeping old history");
                }
            }
            Trigger::Reply { .. } => {}
        }

        let history = self.sessions.get_history(id).await?;
        let prompt = trigger.prompt(&inbound.text);

        let placeholder = sink.send(id, self.placeholders.next()).await?;

        let window = ContextWindow::build(&history, &prompt, &self.window);
        let (reply, succeeded) = match self.complete(window).await {
            Ok(reply) => (reply, true),
            Err(e) => {
                error!(error = %e, "Completion failed");
                (self.settings.fallback_reply.clone(), false)
            }
        };

        if let Err(e) = sink.edit(id, placeholder, &reply).await {
            error!(error = %e, "Failed to deliver reply");
        }

        if !succeeded {
            return Ok(TurnOutcome::Fallback);
        }
        let recorded = match self.sessions.record_reply(id, reply).await {
            Ok(()) => true,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => false,
        };
        Ok(TurnOutcome::Replied { recorded })
    }

    async fn complete(&self, window: ContextWindow) -> Result<String, BotError> {
        debug!(carried = window.history_len(), "Requesting completion");
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: window.into_messages(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| BotError::remote(self.provider.name(), format!("{e:#}")))?;

        if response.content.trim().is_empty() {
            return Err(BotError::remote(self.provider.name(), "empty reply"));
        }
        info!(
            provider = %response.provider,
            tokens = response.tokens_used,
            latency_ms = response.latency_ms,
            "Completion received"
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::FixedPicker;
    use grokgram_core::{ChatMessage, ConversationHistory, HistoryEntry, Role};
    use grokgram_memory::{HistoryStore, InMemoryHistoryStore};
    use grokgram_providers::MockProvider;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        edits: Mutex<Vec<(SentMessage, String)>>,
    }

    #[async_trait]
    impl ReplySink for RecordingSink {
        async fn send(&self, _c: ConversationId, text: &str) -> Result<SentMessage, BotError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(text.to_string());
            Ok(SentMessage(sent.len() as i32))
        }

        async fn edit(
            &self,
            _c: ConversationId,
            message: SentMessage,
            text: &str,
        ) -> Result<(), BotError> {
            self.edits.lock().unwrap().push((message, text.to_string()));
            Ok(())
        }
    }

    /// Store that reads fine but rejects every write.
    struct ReadOnlyStore;

    #[async_trait]
    impl HistoryStore for ReadOnlyStore {
        fn max_history(&self) -> usize {
            10
        }
        async fn load(&self, _id: ConversationId) -> Result<ConversationHistory, BotError> {
            Ok(ConversationHistory::new())
        }
        async fn append(&self, _id: ConversationId, _e: HistoryEntry) -> Result<(), BotError> {
            Err(BotError::storage_io("database is locked"))
        }
        async fn clear(&self, _id: ConversationId) -> Result<(), BotError> {
            Ok(())
        }
        async fn conversations(&self) -> Result<Vec<ConversationId>, BotError> {
            Ok(Vec::new())
        }
    }

    fn replying(text: &str) -> Arc<MockProvider> {
        Arc::new(MockProvider::new("grok").with_response(text))
    }

    fn agent_with(sessions: SessionCoordinator, provider: Arc<MockProvider>) -> ChatAgent {
        ChatAgent::new(
            Arc::new(sessions),
            provider,
            Placeholders::new(vec!["thinking".into()], FixedPicker(0)),
            WindowPolicy::default(),
            AgentSettings {
                bot_username: "GrokBot".into(),
                ..AgentSettings::default()
            },
        )
    }

    fn agent(provider: Arc<MockProvider>) -> ChatAgent {
        let sessions = SessionCoordinator::new(Arc::new(InMemoryHistoryStore::new()));
        agent_with(sessions, provider)
    }

    fn last_messages(provider: &MockProvider) -> Vec<ChatMessage> {
        provider.last_request().unwrap().messages
    }

    fn inbound(text: &str, reply_to_bot: Option<&str>) -> Inbound {
        Inbound {
            conversation: ConversationId(10),
            text: text.into(),
            reply_to_bot: reply_to_bot.map(String::from),
        }
    }

    #[test]
    fn test_classify() {
        let c = |text: &str, reply: Option<&str>| {
            Trigger::classify(&inbound(text, reply), "GrokBot")
        };
        assert_eq!(c("", None), Trigger::Ignore);
        assert_eq!(c("hello all", None), Trigger::Ignore);
        assert_eq!(c("/forget", None), Trigger::Forget);
        assert_eq!(c("/forget@GrokBot", Some("x")), Trigger::Forget);
        assert_eq!(c("hey @grokbot what's up", None), Trigger::Mention);
        assert_eq!(
            c("@GrokBot and more", Some("earlier")),
            Trigger::Reply {
                previous: "earlier".into()
            }
        );
    }

    #[test]
    fn test_reply_prompt() {
        let reply = Trigger::Reply {
            previous: "42".into(),
        };
        assert_eq!(reply.prompt("why?"), "Previous answer: 42\nNew question: why?");
        let empty = Trigger::Reply {
            previous: String::new(),
        };
        assert_eq!(empty.prompt("why?"), "why?");
        assert_eq!(Trigger::Mention.prompt("@GrokBot hi"), "@GrokBot hi");
    }

    #[tokio::test]
    async fn test_mention_replies_and_records() {
        let agent = agent(replying("the answer"));
        let sink = RecordingSink::default();

        let outcome = agent.handle(inbound("@GrokBot hi", None), &sink).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Replied { recorded: true });
        assert_eq!(*sink.sent.lock().unwrap(), vec!["thinking"]);
        assert_eq!(
            *sink.edits.lock().unwrap(),
            vec![(SentMessage(1), "the answer".to_string())]
        );
        assert_eq!(
            agent.sessions().get_history(ConversationId(10)).await.unwrap(),
            vec!["the answer"]
        );
    }

    #[tokio::test]
    async fn test_reply_carries_history_into_window() {
        let provider = replying("next");
        let agent = agent(provider.clone());
        let id = ConversationId(10);
        for i in 1..=8 {
            agent.sessions().record_reply(id, format!("a{i}")).await.unwrap();
        }

        let sink = RecordingSink::default();
        agent.handle(inbound("more", Some("a8")), &sink).await.unwrap();

        let messages = last_messages(&provider);
        assert_eq!(messages.len(), 9);
        assert_eq!(messages[1], ChatMessage::assistant("a2"));
        assert_eq!(messages[8].role, Role::User);
        assert_eq!(messages[8].content, "Previous answer: a8\nNew question: more");
        assert_eq!(agent.sessions().get_history(id).await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_mention_starts_fresh_thread() {
        let provider = replying("fresh");
        let agent = agent(provider.clone());
        let id = ConversationId(10);
        agent.sessions().record_reply(id, "stale").await.unwrap();

        agent
            .handle(inbound("@GrokBot new topic", None), &RecordingSink::default())
            .await
            .unwrap();

        assert_eq!(last_messages(&provider).len(), 2);
        assert_eq!(agent.sessions().get_history(id).await.unwrap(), vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_forget_clears_without_completion() {
        let provider = replying("unused");
        let agent = agent(provider.clone());
        let id = ConversationId(10);
        agent.sessions().record_reply(id, "old").await.unwrap();

        let sink = RecordingSink::default();
        let outcome = agent.handle(inbound("/forget", None), &sink).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Cleared);
        assert_eq!(*sink.sent.lock().unwrap(), vec!["Context cleared."]);
        assert_eq!(provider.calls(), 0);
        assert!(agent.sessions().get_history(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_shows_fallback_and_records_nothing() {
        let provider = Arc::new(MockProvider::new("grok").failing("connection refused"));
        let agent = agent(provider);
        let sink = RecordingSink::default();

        let outcome = agent.handle(inbound("@GrokBot hi", None), &sink).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Fallback);
        assert_eq!(
            sink.edits.lock().unwrap()[0].1,
            AgentSettings::default().fallback_reply
        );
        assert!(agent.sessions().get_history(ConversationId(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_is_reported_in_outcome() {
        let sessions = SessionCoordinator::new(Arc::new(ReadOnlyStore));
        let agent = agent_with(sessions, replying("the answer"));
        let sink = RecordingSink::default();

        let outcome = agent.handle(inbound("@GrokBot hi", None), &sink).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Replied { recorded: false });
        assert_eq!(sink.edits.lock().unwrap()[0].1, "the answer");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_the_turn() {
        let sessions = SessionCoordinator::lazy(|| Err(BotError::storage_io("disk missing")));
        let provider = replying("unused");
        let agent = agent_with(sessions, provider.clone());
        let sink = RecordingSink::default();

        let err = agent.handle(inbound("@GrokBot hi", None), &sink).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(provider.calls(), 0);

        let again = agent.handle(inbound("@GrokBot hi", None), &sink).await.unwrap_err();
        assert!(again.is_fatal());
    }

    #[tokio::test]
    async fn test_unaddressed_message_is_ignored() {
        let provider = replying("unused");
        let agent = agent(provider.clone());
        let sink = RecordingSink::default();

        let outcome = agent.handle(inbound("just chatting", None), &sink).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Ignored);
        assert!(sink.sent.lock().unwrap().is_empty());
        assert_eq!(provider.calls(), 0);
    }
}
