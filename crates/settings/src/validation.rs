//! Settings validation
//!
//! Applied before a save; an invalid form is never persisted.

use regex::Regex;
use thiserror::Error;

lazy_static::lazy_static! {
    /// Google API key shape: `AIza` followed by 35 URL-safe characters
    pub static ref API_KEY_REGEX: Regex =
        Regex::new(r"^AIza[0-9A-Za-z_-]{35}$").unwrap();
}

/// Prefix every fully qualified model id carries
pub const MODEL_PREFIX: &str = "models/";

/// All problems found in a settings form, one per line
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", .errors.join("\n"))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

impl From<ValidationError> for gemchat_common::Error {
    fn from(err: ValidationError) -> Self {
        gemchat_common::Error::Validation(err.to_string())
    }
}

/// Settings that passed validation and may be persisted
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedSettings {
    api_key: String,
    model: String,
}

impl ValidatedSettings {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for ValidatedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedSettings")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

pub fn validate_api_key(api_key: &str) -> Result<(), String> {
    if api_key.is_empty() {
        return Err("API key is required".to_string());
    }
    if !API_KEY_REGEX.is_match(api_key) {
        return Err("Invalid API key format".to_string());
    }
    Ok(())
}

pub fn validate_model_id(model: &str) -> Result<(), String> {
    if model.is_empty() {
        return Err("Model selection is required".to_string());
    }
    if !model.starts_with(MODEL_PREFIX) || model.len() == MODEL_PREFIX.len() {
        return Err("Invalid model format".to_string());
    }
    Ok(())
}

/// Prefix a bare model name with `models/`
pub fn normalize_model_id(model: &str) -> String {
    let model = model.trim();
    if model.is_empty() || model.starts_with(MODEL_PREFIX) {
        model.to_string()
    } else {
        format!("{}{}", MODEL_PREFIX, model)
    }
}

/// Validate both fields, collecting every error
pub fn validate_settings(api_key: &str, model: &str) -> Result<ValidatedSettings, ValidationError> {
    let errors: Vec<String> = [validate_api_key(api_key), validate_model_id(model)]
        .into_iter()
        .filter_map(Result::err)
        .collect();

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    Ok(ValidatedSettings {
        api_key: api_key.to_string(),
        model: model.to_string(),
    })
}

/// Normalize the model id, then validate; the save path uses this
pub fn prepare_for_save(api_key: &str, model: &str) -> Result<ValidatedSettings, ValidationError> {
    validate_settings(api_key, &normalize_model_id(model))
}
