use anyhow::Result;
use async_trait::async_trait;

use crate::message::ChatMessage;

/// Chat-completion backend the bot forwards context windows to.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g., "grok", "mock").
    fn name(&self) -> &str;

    /// Send a completion request and return the reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Request to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Response from a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
