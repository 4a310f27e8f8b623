pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::BotError;
pub use message::{ChatMessage, Role};
pub use traits::{CompletionProvider, CompletionRequest, CompletionResponse};
pub use types::{
    ConversationHistory, ConversationId, HistoryEntry, DEFAULT_MAX_CONTEXT_MESSAGES,
    DEFAULT_MAX_HISTORY, DEFAULT_SYSTEM_DIRECTIVE,
};
