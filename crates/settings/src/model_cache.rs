//! Cached model list
//!
//! The list is stored as JSON next to the millisecond timestamp of the fetch
//! that produced it. Entries older than [`MODEL_CACHE_TTL_MS`] are stale.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::{KeyValueStore, StoreError};

/// Store key holding the serialized model list
pub const MODELS_KEY: &str = "geminiModels";

/// Store key holding the fetch time in milliseconds since the epoch
pub const MODELS_TIMESTAMP_KEY: &str = "geminiModelsTimestamp";

/// Age after which a cached list is refetched
pub const MODEL_CACHE_TTL_MS: i64 = 5 * 60 * 1000;

#[derive(Clone)]
pub struct ModelCache {
    store: Arc<dyn KeyValueStore>,
    ttl_ms: i64,
}

impl ModelCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl_ms: MODEL_CACHE_TTL_MS,
        }
    }

    /// Return the cached list if one exists and is younger than the TTL
    ///
    /// A timestamp or list that cannot be parsed counts as a miss.
    pub fn load_fresh<T: DeserializeOwned>(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<T>>, StoreError> {
        let (Some(raw_models), Some(raw_timestamp)) = (
            self.store.get(MODELS_KEY)?,
            self.store.get(MODELS_TIMESTAMP_KEY)?,
        ) else {
            return Ok(None);
        };

        let Ok(fetched_at) = raw_timestamp.trim().parse::<i64>() else {
            tracing::warn!(timestamp = %raw_timestamp, "Ignoring unparseable model cache timestamp");
            return Ok(None);
        };

        let Some(age_ms) = now.timestamp_millis().checked_sub(fetched_at) else {
            tracing::warn!(timestamp = fetched_at, "Ignoring out-of-range model cache timestamp");
            return Ok(None);
        };
        if age_ms >= self.ttl_ms {
            tracing::debug!(age_ms, "Model cache is stale");
            return Ok(None);
        }

        match serde_json::from_str(&raw_models) {
            Ok(models) => Ok(Some(models)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparseable model cache");
                Ok(None)
            }
        }
    }

    /// Replace the cached list, stamping it with `now`
    pub fn store<T: Serialize>(&self, models: &[T], now: DateTime<Utc>) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(models)?;
        let fetched_at = now.timestamp_millis().to_string();
        self.store.set_many(&[
            (MODELS_KEY, encoded.as_str()),
            (MODELS_TIMESTAMP_KEY, fetched_at.as_str()),
        ])?;
        tracing::debug!(count = models.len(), "Model cache updated");
        Ok(())
    }

    /// Forget the cached list
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(MODELS_KEY)?;
        self.store.remove(MODELS_TIMESTAMP_KEY)?;
        tracing::debug!("Model cache cleared");
        Ok(())
    }
}
