//! Model catalogue types
//!
//! The list endpoint returns every model the key can see; only models that
//! support `generateContent` are useful for chat.

use serde::{Deserialize, Serialize};

/// Generation method a model must support to be offered for chat
pub const GENERATE_CONTENT_METHOD: &str = "generateContent";

/// A chat-capable model as presented to the model picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Fully qualified model id, e.g. `models/gemini-1.5-flash`
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub input_token_limit: u64,
    pub output_token_limit: u64,
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == GENERATE_CONTENT_METHOD)
    }
}

/// Model list response body
#[derive(Debug, Deserialize)]
pub(crate) struct ModelListResponse {
    #[serde(default)]
    pub models: Vec<RawModel>,
}

/// Model entry as returned by the API; every field but `name` may be absent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawModel {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_token_limit: u64,
    #[serde(default)]
    pub output_token_limit: u64,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl From<RawModel> for ModelInfo {
    fn from(raw: RawModel) -> Self {
        let display_name = raw.display_name.unwrap_or_else(|| raw.name.clone());
        Self {
            name: raw.name,
            display_name,
            description: raw.description.unwrap_or_default(),
            input_token_limit: raw.input_token_limit,
            output_token_limit: raw.output_token_limit,
            supported_generation_methods: raw.supported_generation_methods,
        }
    }
}

/// Keep chat-capable models, in the order the API listed them
pub(crate) fn chat_models(response: ModelListResponse) -> Vec<ModelInfo> {
    response
        .models
        .into_iter()
        .map(ModelInfo::from)
        .filter(ModelInfo::supports_generate_content)
        .collect()
}
