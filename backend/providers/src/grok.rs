use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use grokgram_core::{ChatMessage, CompletionProvider, CompletionRequest, CompletionResponse};
use grokgram_logging::redact_sensitive_data;

pub const DEFAULT_API_URL: &str = "https://api.x.ai/v1/chat/completions";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest slice of an error body kept in error messages.
const BODY_SNIPPET_LEN: usize = 512;

/// xAI Grok chat-completions provider (OpenAI-compatible wire format).
pub struct GrokProvider {
    client: Client,
    api_key: String,
    api_url: String,
}

impl GrokProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Full chat-completions endpoint URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn snippet(body: &str) -> String {
    let cut: String = body.chars().take(BODY_SNIPPET_LEN).collect();
    redact_sensitive_data(&cut)
}

/// Extract the first choice's text and the token count from a response body.
fn parse_reply(body: &str) -> Result<(String, u64)> {
    let response: ChatResponse = serde_json::from_str(body)
        .with_context(|| format!("JSON parse error | Body: {}", snippet(body)))?;

    let tokens_used = response.usage.and_then(|u| u.total_tokens).unwrap_or(0);
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .with_context(|| format!("empty choices | Body: {}", snippet(body)))?;

    Ok((content, tokens_used))
}

#[async_trait]
impl CompletionProvider for GrokProvider {
    fn name(&self) -> &str {
        "grok"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending request to Grok"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Grok HTTP request failed")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Grok response body")?;

        if !status.is_success() {
            warn!(%status, "Grok returned an error status");
            anyhow::bail!("Grok returned {}: {}", status, snippet(&text));
        }

        let (content, tokens_used) = parse_reply(&text)?;

        Ok(CompletionResponse {
            content,
            provider: "grok".to_string(),
            model: request.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
