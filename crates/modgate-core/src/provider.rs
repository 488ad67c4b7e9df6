//! External moderation providers.
//!
//! The provider is a black box that takes one string or a batch of strings
//! and answers with a JSON verdict. [`OpenAiProvider`] talks to the OpenAI
//! moderation endpoint; tests plug in their own implementations.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ClassificationError, Result};

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default moderation model.
pub const DEFAULT_MODERATION_MODEL: &str = "text-moderation-latest";

/// Value shipped in sample `.env` files; treated as "not configured".
pub const PLACEHOLDER_API_KEY: &str = "your-api-key";

/// The call shape the provider expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModerationInput {
    /// One string.
    Single(String),
    /// An ordered batch classified in one call.
    Batch(Vec<String>),
}

impl ModerationInput {
    /// Number of strings in the call.
    pub fn len(&self) -> usize {
        match self {
            ModerationInput::Single(_) => 1,
            ModerationInput::Batch(items) => items.len(),
        }
    }

    /// Returns true for an empty batch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A content moderation backend.
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Classifies the input and returns the raw provider response.
    async fn moderate(&self, input: ModerationInput) -> Result<Value>;

    /// Returns the name of this provider for logging.
    fn name(&self) -> &'static str;
}

/// Configuration for [`OpenAiProvider`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (bearer token).
    pub api_key: Option<String>,
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Moderation model name.
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODERATION_MODEL.to_string(),
        }
    }
}

impl OpenAiConfig {
    /// Creates a config with the given API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Returns true if a usable credential is configured.
    pub fn has_credential(&self) -> bool {
        credential_configured(self.api_key.as_deref())
    }
}

/// Returns true if the key is present and not the sample placeholder.
pub fn credential_configured(api_key: Option<&str>) -> bool {
    matches!(api_key, Some(key) if !key.trim().is_empty() && key != PLACEHOLDER_API_KEY)
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a ModerationInput,
}

/// OpenAI moderation API client.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Creates a provider with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("Modgate/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/moderations", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModerationProvider for OpenAiProvider {
    async fn moderate(&self, input: ModerationInput) -> Result<Value> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|_| self.config.has_credential())
            .ok_or(ClassificationError::MissingCredential)?;

        debug!(
            model = %self.config.model,
            inputs = input.len(),
            "Calling moderation endpoint"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&ModerationRequest {
                model: &self.config.model,
                input: &input,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(ClassificationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
