use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use grokgram_core::{CompletionProvider, CompletionRequest, CompletionResponse};

/// A mock provider that returns canned responses or a canned failure.
///
/// Every request is kept so tests can inspect the context window they sent.
pub struct MockProvider {
    name: String,
    fixed_response: Option<String>,
    failure: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of completion requests received so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().ok()?.last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }
        if let Some(message) = &self.failure {
            anyhow::bail!("{message}");
        }
        // Echo the prompt when no canned response is set.
        let content = self.fixed_response.clone().unwrap_or_else(|| {
            req.messages
                .last()
                .map(|m| format!("Mock response to: {}", m.content))
                .unwrap_or_else(|| "Mock response".to_string())
        });
        Ok(CompletionResponse {
            content,
            provider: self.name.clone(),
            model: req.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}
