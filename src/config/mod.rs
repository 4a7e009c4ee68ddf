//! Runtime configuration: advisory service settings and local credentials.

mod credentials;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::OpenAiClient;
use crate::risk::{FeedbackProvider, OfflineAdvisor};

pub use credentials::{mask, CredentialStore, DATABASE_URL, OPENAI_API_KEY};

/// Default trade store location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./tradejournal.db?mode=rwc";

/// Default credential file location.
pub const DEFAULT_CREDENTIALS_PATH: &str = "./.tradejournal-credentials.json";

/// Settings for the text-generation service behind risk feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens in the reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// API base URL (without the /chat/completions suffix)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.7
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    20
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AdvisorConfig {
    /// Defaults overridden by `TRADEJOURNAL_ADVISOR_MODEL`,
    /// `TRADEJOURNAL_ADVISOR_URL` and `TRADEJOURNAL_ADVISOR_TIMEOUT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("TRADEJOURNAL_ADVISOR_MODEL") {
            config.model = model;
        }
        if let Ok(url) = std::env::var("TRADEJOURNAL_ADVISOR_URL") {
            config.base_url = url;
        }
        match std::env::var("TRADEJOURNAL_ADVISOR_TIMEOUT").map(|v| v.parse::<u64>()) {
            Ok(Ok(secs)) => config.timeout_secs = secs,
            Ok(Err(e)) => warn!(error = %e, "Ignoring invalid TRADEJOURNAL_ADVISOR_TIMEOUT"),
            Err(_) => {}
        }

        config
    }
}

/// Resolve the API key: environment first, then the credential store.
pub fn resolve_api_key(credentials: &CredentialStore) -> Option<String> {
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| credentials.get(OPENAI_API_KEY).map(str::to_string))
}

/// Pick the advisor implementation for this run.
///
/// Offline mode, a missing key, or a client that fails to build all select
/// the offline advisor.
pub fn select_advisor(
    config: AdvisorConfig,
    api_key: Option<String>,
    offline: bool,
) -> Arc<dyn FeedbackProvider> {
    if offline {
        info!("Risk feedback running offline");
        return Arc::new(OfflineAdvisor);
    }

    let Some(key) = api_key else {
        info!("No API key configured; risk feedback will use built-in rules");
        return Arc::new(OfflineAdvisor);
    };

    match OpenAiClient::new(config, key) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "Failed to create advisor client; using built-in rules");
            Arc::new(OfflineAdvisor)
        }
    }
}
