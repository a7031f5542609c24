use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::llm::gemini::GeminiProvider;
use crate::llm::mock::MockProvider;
use crate::llm::ollama::OllamaProvider;
use crate::utils::config::{Config, Provider};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed response from {provider}: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },

    #[error("empty response from {0}")]
    Empty(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One pass over a single response; finite and not restartable.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send messages to the backend and return the assistant response text.
    fn chat(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    /// Stream the assistant response as text chunks.
    fn chat_stream(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<ChatStream, ProviderError>> + Send;
}

/// Shared HTTP client for providers. 10s connect timeout, 120s request
/// timeout to leave room for slow local inference.
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("cv-tailor/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("default HTTP client construction must not fail")
}

/// Backend selected by configuration at startup.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    Gemini(GeminiProvider),
    Mock(MockProvider),
}

impl AnyProvider {
    /// Build the configured provider. `model` overrides the configured model
    /// name when given (the `--model` CLI flag).
    pub fn from_config(config: &Config, model: Option<&str>) -> crate::error::Result<Self> {
        let model = model.unwrap_or(&config.model).to_string();

        match config.provider {
            Provider::Ollama => Ok(Self::Ollama(OllamaProvider::new(
                &config.base_url,
                model,
                config.temperature,
            ))),
            Provider::Gemini => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    crate::error::Error::Config(
                        "CV_TAILOR_API_KEY must be set for the gemini provider".into(),
                    )
                })?;
                Ok(Self::Gemini(GeminiProvider::new(
                    api_key,
                    model,
                    config.temperature,
                    config.max_tokens,
                )))
            }
            Provider::Mock => Ok(Self::Mock(MockProvider::new(model))),
        }
    }

    /// Single-prompt completion; the convenience path used by the tailoring
    /// pipeline.
    pub async fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        self.chat(&messages).await
    }
}

impl LlmProvider for AnyProvider {
    fn name(&self) -> &'static str {
        match self {
            Self::Ollama(p) => p.name(),
            Self::Gemini(p) => p.name(),
            Self::Mock(p) => p.name(),
        }
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        match self {
            Self::Ollama(p) => p.chat(messages).await,
            Self::Gemini(p) => p.chat(messages).await,
            Self::Mock(p) => p.chat(messages).await,
        }
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, ProviderError> {
        match self {
            Self::Ollama(p) => p.chat_stream(messages).await,
            Self::Gemini(p) => p.chat_stream(messages).await,
            Self::Mock(p) => p.chat_stream(messages).await,
        }
    }
}
