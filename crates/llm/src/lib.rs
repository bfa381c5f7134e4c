//! gemchat Completion Service
//!
//! Provides single-turn text completion against a generative-language API:
//! - Gemini REST integration for production
//! - Mock completion service for testing and development
//! - Model catalogue listing filtered to models that can generate content

pub mod gemini;
pub mod mock;
pub mod models;

use gemchat_common::Config;
use thiserror::Error;

pub use models::ModelInfo;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("LLM configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// HTTP status of an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<LlmError> for gemchat_common::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(msg) => gemchat_common::Error::Configuration(msg),
            other => gemchat_common::Error::Completion(other.to_string()),
        }
    }
}

/// Safety category applied to every completion request
pub const SAFETY_CATEGORY: &str = "HARM_CATEGORY_DANGEROUS_CONTENT";

/// Blocking threshold for [`SAFETY_CATEGORY`]
pub const SAFETY_THRESHOLD: &str = "BLOCK_ONLY_HIGH";

/// Fixed sampling parameters sent with every completion request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

pub const GENERATION_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.9,
    top_p: 1.0,
    top_k: 1,
    max_output_tokens: 2048,
};

/// A single-turn completion request
///
/// Only the prompt is sent; earlier turns of the local transcript are not.
#[derive(Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub api_key: String,
    pub model: String,
}

impl CompletionRequest {
    pub fn new(
        prompt: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("prompt", &self.prompt)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Completion service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Completion provider (gemini, mock)
    pub provider: String,
    /// Base URL of the REST API, without a trailing slash
    pub base_url: String,
}

impl From<&Config> for LlmConfig {
    fn from(config: &Config) -> Self {
        Self {
            provider: config.llm_provider.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Completion service trait for different backends
#[async_trait::async_trait]
pub trait LlmService: Send + Sync {
    /// Perform one completion call and return the reply text
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// List the models that support content generation
    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, LlmError>;

    /// Provider name, for logging
    fn provider(&self) -> &str;
}

/// Factory for creating LlmService implementations
pub struct LlmServiceFactory;

impl LlmServiceFactory {
    /// Create an LlmService based on configuration
    pub fn create(config: LlmConfig) -> Result<Box<dyn LlmService>, LlmError> {
        match config.provider.as_str() {
            "gemini" => {
                tracing::info!(base_url = %config.base_url, "Creating Gemini completion service");
                if config.base_url.is_empty() {
                    return Err(LlmError::Configuration(
                        "GEMCHAT_API_BASE_URL must not be empty".to_string(),
                    ));
                }
                Ok(Box::new(gemini::GeminiService::new(config)))
            }
            "mock" => {
                tracing::info!("Creating mock completion service");
                Ok(Box::new(mock::MockLlmService::new()))
            }
            provider => Err(LlmError::Configuration(format!(
                "Unknown LLM provider: {}. Supported providers: gemini, mock",
                provider
            ))),
        }
    }
}
