//! API key and model persistence
//!
//! No validation happens here; callers validate before `save`.

use std::sync::Arc;

use crate::store::{KeyValueStore, StoreError};
use crate::validation::ValidatedSettings;

/// Store key holding the API credential
pub const API_KEY_KEY: &str = "geminiApiKey";

/// Store key holding the selected model id
pub const MODEL_KEY: &str = "selectedModel";

/// The two user settings, as an explicit value passed into the send path
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    api_key: Option<String>,
    model: Option<String>,
}

impl Settings {
    /// Build settings, treating empty strings as unset
    pub fn new(api_key: Option<String>, model: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.is_empty()),
            model: model.filter(|model| !model.is_empty()),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Replace the model only, as the model picker does before a save
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = (!model.is_empty()).then_some(model);
        self
    }
}

impl From<&ValidatedSettings> for Settings {
    fn from(validated: &ValidatedSettings) -> Self {
        Self::new(
            Some(validated.api_key().to_string()),
            Some(validated.model().to_string()),
        )
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .finish()
    }
}

/// Reads and writes the persisted settings
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load whatever is persisted; either field may be absent
    pub fn load(&self) -> Result<Settings, StoreError> {
        let settings = Settings::new(self.store.get(API_KEY_KEY)?, self.store.get(MODEL_KEY)?);
        tracing::debug!(
            has_api_key = settings.api_key().is_some(),
            model = ?settings.model(),
            "Loaded persisted settings"
        );
        Ok(settings)
    }

    /// Overwrite both entries in one write
    pub fn save(&self, api_key: &str, model: &str) -> Result<(), StoreError> {
        self.store
            .set_many(&[(API_KEY_KEY, api_key), (MODEL_KEY, model)])?;
        tracing::info!(model = %model, "Settings saved");
        Ok(())
    }

    /// Persist settings that already passed validation
    pub fn save_validated(&self, settings: &ValidatedSettings) -> Result<Settings, StoreError> {
        self.save(settings.api_key(), settings.model())?;
        Ok(Settings::from(settings))
    }
}
