//! Credential store for gemchat
//!
//! Persists the two user settings (API key, model id) and the cached model
//! list to a durable key-value store, and validates settings before they are
//! saved.

pub mod credentials;
pub mod model_cache;
pub mod store;
pub mod validation;

pub use credentials::{CredentialStore, Settings, API_KEY_KEY, MODEL_KEY};
pub use model_cache::{ModelCache, MODELS_KEY, MODELS_TIMESTAMP_KEY, MODEL_CACHE_TTL_MS};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use validation::{
    normalize_model_id, prepare_for_save, validate_api_key, validate_model_id,
    validate_settings, ValidatedSettings, ValidationError,
};
