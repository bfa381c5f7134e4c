//! gemchat application composition root
//!
//! Wires the conversation registry, the completion service and the settings
//! store together. The presentation layer talks to [`ChatApp`] only.

pub mod orchestrator;
pub mod telemetry;

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;

use gemchat_common::{Config, Error, Result};
use gemchat_conversations::{
    Conversation, ConversationId, ConversationRegistry, Message, RegistryError, RegistryLimits,
};
use gemchat_llm::{LlmConfig, LlmService, LlmServiceFactory, ModelInfo};
use gemchat_settings::{
    prepare_for_save, CredentialStore, FileStore, KeyValueStore, ModelCache, Settings,
};

pub struct ChatApp {
    registry: Arc<ConversationRegistry>,
    llm: Arc<dyn LlmService>,
    settings: ArcSwap<Settings>,
    credentials: CredentialStore,
    models: ModelCache,
}

impl ChatApp {
    /// Assemble the app; persisted settings are loaded once, here
    pub fn new(
        registry: Arc<ConversationRegistry>,
        llm: Arc<dyn LlmService>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let credentials = CredentialStore::new(Arc::clone(&store));
        let settings = credentials.load()?;

        Ok(Self {
            registry,
            llm,
            settings: ArcSwap::from_pointee(settings),
            credentials,
            models: ModelCache::new(store),
        })
    }

    /// Build everything from environment configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = FileStore::open(config.settings_path())?;
        let llm = LlmServiceFactory::create(LlmConfig::from(config))?;
        let limits = RegistryLimits {
            max_messages: config.max_history,
        };

        tracing::info!(
            provider = llm.provider(),
            settings_path = %store.path().display(),
            max_history = ?config.max_history,
            "Application configured"
        );

        Self::new(
            Arc::new(ConversationRegistry::with_limits(limits)),
            Arc::from(llm),
            Arc::new(store),
        )
    }

    pub fn registry(&self) -> &Arc<ConversationRegistry> {
        &self.registry
    }

    /// Current settings, as threaded into each send
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    pub fn select_chat(&self, id: &ConversationId) -> Arc<Conversation> {
        self.registry.select_conversation(id)
    }

    /// Open a chat under a fresh id and select it
    pub fn new_chat(&self) -> (ConversationId, Arc<Conversation>) {
        let id = ConversationId::generate();
        let conversation = self.registry.select_conversation(&id);
        (id, conversation)
    }

    pub fn clear_chat(&self, id: &ConversationId) -> Result<Arc<Conversation>> {
        Ok(self.registry.clear_conversation(id)?)
    }

    /// Append `text` to the selected chat and resolve it with one completion call
    ///
    /// A rejected append makes no call. A failed call is not an `Err`: it lands
    /// in the conversation's error slot. If the chat was cleared while the call
    /// was in flight, the outcome is dropped and the current chat is returned.
    pub async fn send_message(&self, id: &ConversationId, text: &str) -> Result<Arc<Conversation>> {
        let message = Message::new_user(text)?;
        let request = message.id;
        let prompt = message.text.clone();
        self.registry.append_user_message(id, message)?;

        let settings = self.settings();
        let outcome = orchestrator::request_completion(self.llm.as_ref(), &settings, &prompt).await;
        match self.registry.resolve(id, request, outcome) {
            Ok(conversation) => Ok(conversation),
            Err(RegistryError::Superseded { .. }) => self
                .registry
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("Conversation {} does not exist", id))),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate, persist, then publish new settings
    ///
    /// A bare model name is prefixed with `models/`. Invalid input is not saved.
    pub fn save_settings(&self, api_key: &str, model: &str) -> Result<Arc<Settings>> {
        let validated = prepare_for_save(api_key, model).map_err(|e| {
            tracing::info!(errors = e.errors.len(), "Rejected settings");
            Error::from(e)
        })?;

        let previous = self.settings();
        let settings = Arc::new(self.credentials.save_validated(&validated)?);
        self.settings.store(Arc::clone(&settings));

        if previous.api_key() != settings.api_key() {
            if let Err(e) = self.models.clear() {
                tracing::warn!(error = %e, "Failed to drop model list cached for the previous key");
            }
        }
        Ok(settings)
    }

    /// Change only the model, keeping the current API key
    pub fn set_model(&self, model: &str) -> Result<Arc<Settings>> {
        let current = self.settings();
        self.save_settings(current.api_key().unwrap_or_default(), model)
    }

    /// Chat-capable models, from the cache while it is fresh
    ///
    /// Requires an API key even when a cached list exists.
    pub async fn available_models(&self) -> Result<Vec<ModelInfo>> {
        let settings = self.settings();
        let api_key = settings
            .api_key()
            .ok_or_else(|| Error::Validation(orchestrator::MISSING_API_KEY.to_string()))?;

        if let Some(models) = self.models.load_fresh::<ModelInfo>(Utc::now())? {
            tracing::debug!(count = models.len(), "Using cached model list");
            return Ok(models);
        }

        let models = self.llm.list_models(api_key).await?;
        if let Err(e) = self.models.store(&models, Utc::now()) {
            tracing::warn!(error = %e, "Failed to cache model list");
        }
        Ok(models)
    }
}
