//! grokgram conversation agent
//!
//! Everything between an inbound chat message and the outbound reply:
//! bounded history access, context window selection, placeholder choice,
//! and the per-turn flow driving the completion provider.

pub mod context_window;
pub mod placeholder;
pub mod session;
pub mod turn;

pub use context_window::{ContextWindow, DEFAULT_SYSTEM_DIRECTIVE, WindowPolicy};
pub use placeholder::{FixedPicker, PlaceholderPicker, Placeholders, RandomPicker};
pub use session::SessionCoordinator;
pub use turn::{
    AgentSettings, DEFAULT_CLEARED_REPLY, DEFAULT_FALLBACK_REPLY, ChatAgent, Inbound, ReplySink,
    SentMessage, Trigger, TurnOutcome,
};
