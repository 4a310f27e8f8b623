//! Persisted shape of one conversation's history.

use grokgram_core::{BotError, ConversationHistory, HistoryEntry};
use serde::{Deserialize, Serialize};

/// Stored value for a `chat_<id>` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub history: ConversationHistory,
}

impl HistoryRecord {
    pub fn decode(raw: &str) -> Result<Self, BotError> {
        serde_json::from_str(raw).map_err(|e| BotError::storage_io(format!("corrupt record: {e}")))
    }

    pub fn encode(&self) -> Result<String, BotError> {
        serde_json::to_string(self).map_err(BotError::storage_io)
    }

    /// Append `entry`, then drop the oldest entries until at most `max_history` remain.
    pub fn push_bounded(&mut self, entry: HistoryEntry, max_history: usize) {
        self.history.push(entry);
        if self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
    }
}
