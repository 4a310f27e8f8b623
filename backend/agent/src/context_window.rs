//! Context window selection.
//!
//! Turns the retained history plus a new prompt into the bounded message
//! sequence sent to the completion provider. Pure and deterministic.

pub use grokgram_core::DEFAULT_SYSTEM_DIRECTIVE;
use grokgram_core::{ChatMessage, DEFAULT_MAX_CONTEXT_MESSAGES, HistoryEntry};

/// Shape of the window: the leading directive and how many messages follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPolicy {
    pub system_directive: String,
    /// History-derived messages plus the prompt. Values below 1 act as 1.
    pub max_context_messages: usize,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            system_directive: DEFAULT_SYSTEM_DIRECTIVE.to_string(),
            max_context_messages: DEFAULT_MAX_CONTEXT_MESSAGES,
        }
    }
}

impl WindowPolicy {
    /// How many history entries fit in front of the prompt.
    pub fn history_slots(&self) -> usize {
        self.max_context_messages.max(1) - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    pub messages: Vec<ChatMessage>,
}

impl ContextWindow {
    /// Directive, then the most recent history suffix oldest first, then the prompt.
    pub fn build(history: &[HistoryEntry], prompt: &str, policy: &WindowPolicy) -> Self {
        let keep = history.len().min(policy.history_slots());
        let recent = &history[history.len() - keep..];

        let mut messages = Vec::with_capacity(keep + 2);
        messages.push(ChatMessage::system(policy.system_directive.clone()));
        messages.extend(recent.iter().map(|entry| ChatMessage::assistant(entry.clone())));
        messages.push(ChatMessage::user(prompt));

        Self { messages }
    }

    /// Number of history entries carried in the window.
    pub fn history_len(&self) -> usize {
        self.messages.len().saturating_sub(2)
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}
