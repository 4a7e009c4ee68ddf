//! OpenAI-compatible chat client used for risk feedback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::AdvisorConfig;
use crate::risk::{AdvisorError, FeedbackProvider};

use super::types::{ChatMessage, ChatRequest, ChatResponse};

/// Client for the chat completions endpoint.
pub struct OpenAiClient {
    client: Client,
    config: AdvisorConfig,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: AdvisorConfig, api_key: String) -> Result<Self, AdvisorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Send a single-turn chat and return the first choice's text.
    pub async fn complete(&self, prompt: &str) -> Result<String, AdvisorError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(url = %url, model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED => AdvisorError::Api("invalid API key".to_string()),
                StatusCode::TOO_MANY_REQUESTS => AdvisorError::Api("rate limit exceeded".to_string()),
                _ => AdvisorError::Api(format!("status {}: {}", status, body)),
            });
        }

        let body = response.text().await?;
        parse_completion(&body)
    }
}

/// Extract the reply text from a raw response body.
fn parse_completion(body: &str) -> Result<String, AdvisorError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AdvisorError::InvalidResponse("no choices in response".to_string()))?;

    debug!(
        model = %parsed.model,
        finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
        "Received chat completion"
    );
    Ok(choice.message.content)
}

#[async_trait]
impl FeedbackProvider for OpenAiClient {
    async fn advise(&self, prompt: &str) -> Result<String, AdvisorError> {
        self.complete(prompt).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
