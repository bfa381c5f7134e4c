//! Gemini API Implementation
//!
//! Calls `{base_url}/{model}:generateContent` and `{base_url}/models`
//! using the reqwest HTTP client. The API key travels as the `key` query
//! parameter, so URLs are stripped from transport errors before they are
//! surfaced.

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::models::{chat_models, ModelListResponse};
use crate::{
    CompletionRequest, LlmConfig, LlmError, LlmService, ModelInfo, GENERATION_PARAMS,
    SAFETY_CATEGORY, SAFETY_THRESHOLD,
};

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl<'a> GenerateContentRequest<'a> {
    fn single_turn(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            safety_settings: vec![SafetySetting {
                category: SAFETY_CATEGORY,
                threshold: SAFETY_THRESHOLD,
            }],
            generation_config: GenerationConfig {
                temperature: GENERATION_PARAMS.temperature,
                top_p: GENERATION_PARAMS.top_p,
                top_k: GENERATION_PARAMS.top_k,
                max_output_tokens: GENERATION_PARAMS.max_output_tokens,
            },
        }
    }
}

/// generateContent response body, reduced to the reply path
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini API error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Pull `candidates[0].content.parts[0].text` out of a response body
pub(crate) fn extract_reply(body: &str) -> Result<String, LlmError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| {
            LlmError::MalformedResponse("Response contained no candidate text".to_string())
        })
}

/// Turn a non-success status and its body into an `LlmError::Api`
fn api_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(code) => format!("{} ({})", parsed.error.message, code),
            None => parsed.error.message,
        },
        Err(_) => format!(
            "Gemini API returned {}",
            status.canonical_reason().unwrap_or("an error")
        ),
    };

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    LlmError::Transport(format!("HTTP request failed: {}", e.without_url()))
}

/// Gemini completion service implementation
pub struct GeminiService {
    client: Client,
    base_url: String,
}

impl GeminiService {
    /// Create a new Gemini service
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str, api_key: &str) -> Result<Url, LlmError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse_with_params(&raw, &[("key", api_key)])
            .map_err(|e| LlmError::Configuration(format!("Invalid API URL {}: {}", raw, e)))
    }

    async fn read_body(response: reqwest::Response) -> Result<String, LlmError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(api_error(status, &body));
        }

        response.text().await.map_err(transport_error)
    }
}

#[async_trait::async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let url = self.url(
            &format!("{}:generateContent", request.model),
            &request.api_key,
        )?;
        let body = GenerateContentRequest::single_turn(&request.prompt);

        tracing::debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let text = Self::read_body(response).await?;
        let reply = extract_reply(&text)?;

        tracing::debug!(model = %request.model, reply_len = reply.len(), "Gemini reply received");
        Ok(reply)
    }

    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, LlmError> {
        let url = self.url("models", api_key)?;

        tracing::debug!("Fetching Gemini model list");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let text = Self::read_body(response).await?;
        let parsed: ModelListResponse = serde_json::from_str(&text).map_err(|e| {
            LlmError::MalformedResponse(format!("Failed to parse model list: {}", e))
        })?;

        let models = chat_models(parsed);
        tracing::debug!(count = models.len(), "Gemini model list received");
        Ok(models)
    }

    fn provider(&self) -> &str {
        "gemini"
    }
}
