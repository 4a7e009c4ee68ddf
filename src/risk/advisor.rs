//! Capability seam for natural-language risk advice.

use async_trait::async_trait;
use thiserror::Error;

/// Failure to obtain advice. Every variant is recovered by the rule-based
/// fallback, so none of these reach the user.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Something that turns a prompt into generated text.
///
/// Called once per request; implementations must not retry.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn advise(&self, prompt: &str) -> Result<String, AdvisorError>;

    /// Short label for logs and the config view.
    fn name(&self) -> &'static str;
}

/// Advisor used when no text-generation service is configured.
#[derive(Debug, Clone, Default)]
pub struct OfflineAdvisor;

#[async_trait]
impl FeedbackProvider for OfflineAdvisor {
    async fn advise(&self, _prompt: &str) -> Result<String, AdvisorError> {
        Err(AdvisorError::Unavailable("offline mode".to_string()))
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}
