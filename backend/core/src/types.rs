use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum replies retained per conversation.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Maximum history-derived messages plus the prompt sent in one request.
pub const DEFAULT_MAX_CONTEXT_MESSAGES: usize = 8;

/// Leading system message of every context window unless configured otherwise.
pub const DEFAULT_SYSTEM_DIRECTIVE: &str = "You are Grok, a helpful AI built by xAI.";

/// A single stored prior assistant reply.
pub type HistoryEntry = String;

/// Ordered replies for one conversation, oldest first.
pub type ConversationHistory = Vec<HistoryEntry>;

/// Identifies one chat. Telegram chat ids are signed 64-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    const KEY_PREFIX: &'static str = "chat_";

    /// Key under which the conversation's record is persisted.
    pub fn storage_key(&self) -> String {
        format!("{}{}", Self::KEY_PREFIX, self.0)
    }

    /// Inverse of [`storage_key`](Self::storage_key).
    pub fn from_storage_key(key: &str) -> Option<Self> {
        key.strip_prefix(Self::KEY_PREFIX)?.parse().ok().map(Self)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for ConversationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key() {
        assert_eq!(ConversationId(42).storage_key(), "chat_42");
        assert_eq!(ConversationId(-100123).storage_key(), "chat_-100123");
    }

    #[test]
    fn test_storage_key_parse_back() {
        let id = ConversationId(-100123);
        assert_eq!(ConversationId::from_storage_key(&id.storage_key()), Some(id));
        assert_eq!(ConversationId::from_storage_key("session_1"), None);
        assert_eq!(ConversationId::from_storage_key("chat_abc"), None);
    }

    #[test]
    fn test_parse_from_cli_arg() {
        assert_eq!(" 77 ".parse::<ConversationId>().unwrap(), ConversationId(77));
        assert!("x".parse::<ConversationId>().is_err());
    }
}
