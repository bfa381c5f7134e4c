//! Conversation registry
//!
//! Owns every conversation of the session and the selected id. The map lives
//! behind an `ArcSwap`; each update clones the map, replaces one entry and
//! swaps the whole map in, so readers always see a consistent snapshot and
//! updates to different conversations never overwrite each other.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use thiserror::Error;

use crate::domain::entities::{Conversation, ConversationId, Message, MessageId};
use crate::domain::outcome::CompletionOutcome;
use crate::domain::state::StateError;
use crate::domain::transition::{apply, ConversationUpdate, RegistryLimits};

/// Immutable view of all conversations
pub type ConversationMap = HashMap<ConversationId, Arc<Conversation>>;

/// Registry-specific error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Conversation {0} is not selected")]
    NotSelected(ConversationId),

    #[error("Conversation {0} does not exist")]
    UnknownConversation(ConversationId),

    #[error("Conversation {0} is waiting for a reply")]
    Busy(ConversationId),

    #[error("Conversation {conversation} is no longer waiting on message {request}")]
    Superseded {
        conversation: ConversationId,
        request: MessageId,
    },

    #[error(transparent)]
    State(#[from] StateError),
}

impl From<RegistryError> for gemchat_common::Error {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownConversation(_) => gemchat_common::Error::NotFound(err.to_string()),
            RegistryError::Busy(_) | RegistryError::Superseded { .. } => {
                gemchat_common::Error::Conflict(err.to_string())
            }
            RegistryError::NotSelected(_) => gemchat_common::Error::Validation(err.to_string()),
            RegistryError::State(_) => gemchat_common::Error::Internal(err.to_string()),
        }
    }
}

pub struct ConversationRegistry {
    conversations: ArcSwap<ConversationMap>,
    selected: ArcSwapOption<ConversationId>,
    limits: RegistryLimits,
}

impl Default for ConversationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::with_limits(RegistryLimits::default())
    }

    pub fn with_limits(limits: RegistryLimits) -> Self {
        Self {
            conversations: ArcSwap::from_pointee(HashMap::new()),
            selected: ArcSwapOption::empty(),
            limits,
        }
    }

    pub fn limits(&self) -> &RegistryLimits {
        &self.limits
    }

    /// Select `id`, creating an empty conversation the first time it is seen
    pub fn select_conversation(&self, id: &ConversationId) -> Arc<Conversation> {
        let mut selected = None;
        self.conversations.rcu(|current| {
            if let Some(existing) = current.get(id) {
                selected = Some(Arc::clone(existing));
                return Arc::clone(current);
            }
            let created = Arc::new(Conversation::new(id.clone()));
            let mut map = ConversationMap::clone(current);
            map.insert(id.clone(), Arc::clone(&created));
            selected = Some(created);
            Arc::new(map)
        });
        self.selected.store(Some(Arc::new(id.clone())));

        tracing::debug!(conversation_id = %id, "Conversation selected");
        // rcu always runs the closure at least once
        selected.unwrap_or_else(|| Arc::new(Conversation::new(id.clone())))
    }

    /// Append a pending user message; the caller must then request a reply
    ///
    /// The returned conversation's `pending_request` is the message's id, which
    /// the caller passes back when the reply or error arrives.
    pub fn append_user_message(
        &self,
        id: &ConversationId,
        message: Message,
    ) -> Result<Arc<Conversation>, RegistryError> {
        if self.selected().as_deref() != Some(id) {
            tracing::debug!(conversation_id = %id, "Rejected message for unselected conversation");
            return Err(RegistryError::NotSelected(id.clone()));
        }

        let update = ConversationUpdate::UserMessage(message);
        let next = self.update(id, |prior| {
            if prior.is_loading() {
                return Err(RegistryError::Busy(id.clone()));
            }
            Ok(apply(prior, update.clone(), &self.limits)?)
        })?;

        tracing::info!(
            conversation_id = %id,
            message_count = next.messages().len(),
            "User message appended"
        );
        Ok(next)
    }

    /// Append the assistant reply to the user message `request`
    pub fn receive_reply(
        &self,
        id: &ConversationId,
        request: MessageId,
        text: impl Into<String>,
    ) -> Result<Arc<Conversation>, RegistryError> {
        let update = ConversationUpdate::Reply {
            request,
            text: text.into(),
        };
        let next = self.resolve_update(id, request, update)?;
        tracing::info!(conversation_id = %id, "Reply received");
        Ok(next)
    }

    /// Record the error for the user message `request`
    pub fn receive_error(
        &self,
        id: &ConversationId,
        request: MessageId,
        error_text: impl Into<String>,
    ) -> Result<Arc<Conversation>, RegistryError> {
        let update = ConversationUpdate::Failure {
            request,
            text: error_text.into(),
        };
        let next = self.resolve_update(id, request, update)?;
        tracing::info!(conversation_id = %id, error = ?next.error(), "Request failed");
        Ok(next)
    }

    /// Apply the outcome of the completion call made for `request`
    pub fn resolve(
        &self,
        id: &ConversationId,
        request: MessageId,
        outcome: CompletionOutcome,
    ) -> Result<Arc<Conversation>, RegistryError> {
        match outcome {
            Ok(reply) => self.receive_reply(id, request, reply),
            Err(failure) => {
                tracing::warn!(
                    conversation_id = %id,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    "Completion failed"
                );
                self.receive_error(id, request, failure.detail)
            }
        }
    }

    /// Reset a conversation to empty and idle
    pub fn clear_conversation(&self, id: &ConversationId) -> Result<Arc<Conversation>, RegistryError> {
        let next = self.update(id, |prior| Ok(apply(prior, ConversationUpdate::Clear, &self.limits)?))?;
        tracing::info!(conversation_id = %id, "Conversation cleared");
        Ok(next)
    }

    pub fn get(&self, id: &ConversationId) -> Option<Arc<Conversation>> {
        self.conversations.load().get(id).cloned()
    }

    pub fn selected(&self) -> Option<Arc<ConversationId>> {
        self.selected.load_full()
    }

    pub fn selected_conversation(&self) -> Option<Arc<Conversation>> {
        self.selected().and_then(|id| self.get(&id))
    }

    /// Every conversation as of now; later updates do not affect it
    pub fn snapshot(&self) -> Arc<ConversationMap> {
        self.conversations.load_full()
    }

    pub fn len(&self) -> usize {
        self.conversations.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.load().is_empty()
    }

    /// Reply or failure; anything but the outstanding request leaves state untouched
    fn resolve_update(
        &self,
        id: &ConversationId,
        request: MessageId,
        update: ConversationUpdate,
    ) -> Result<Arc<Conversation>, RegistryError> {
        self.update(id, |prior| {
            if prior.pending_request() != Some(request) {
                return Err(RegistryError::Superseded {
                    conversation: id.clone(),
                    request,
                });
            }
            Ok(apply(prior, update.clone(), &self.limits)?)
        })
        .inspect_err(|e| match e {
            RegistryError::Superseded { .. } => {
                tracing::info!(conversation_id = %id, message_id = %request, "Dropping superseded resolution");
            }
            _ => {
                tracing::warn!(conversation_id = %id, error = %e, "Ignoring out-of-turn resolution");
            }
        })
    }

    /// Replace one entry via read-copy-update; on error the map is unchanged
    fn update<F>(&self, id: &ConversationId, mut make: F) -> Result<Arc<Conversation>, RegistryError>
    where
        F: FnMut(&Conversation) -> Result<Conversation, RegistryError>,
    {
        let mut result = Err(RegistryError::UnknownConversation(id.clone()));
        self.conversations.rcu(|current| {
            let Some(prior) = current.get(id) else {
                result = Err(RegistryError::UnknownConversation(id.clone()));
                return Arc::clone(current);
            };
            match make(prior.as_ref()) {
                Ok(next) => {
                    let next = Arc::new(next);
                    let mut map = ConversationMap::clone(current);
                    map.insert(id.clone(), Arc::clone(&next));
                    result = Ok(next);
                    Arc::new(map)
                }
                Err(e) => {
                    result = Err(e);
                    Arc::clone(current)
                }
            }
        });
        result
    }
}
