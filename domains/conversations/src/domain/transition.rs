//! Pure conversation transitions
//!
//! `apply` takes the prior conversation and one update and produces the next
//! conversation. Nothing here touches the registry, the clock aside.

use super::entities::{
    Conversation, ConversationPhase, Message, MessageId, MessageStatus, Sender,
};
use super::state::{
    ConversationEvent, ConversationStateMachine, MessageEvent, MessageStatusMachine, StateError,
};

/// Error text used when a failure arrives without any detail
pub const DEFAULT_FAILURE_TEXT: &str = "Failed to send message";

/// One change to a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationUpdate {
    /// A user message to append; a reply request follows
    UserMessage(Message),
    /// The reply to the user message `request`
    Reply { request: MessageId, text: String },
    /// The error for the user message `request`
    Failure { request: MessageId, text: String },
    Clear,
}

impl ConversationUpdate {
    fn event(&self) -> ConversationEvent {
        match self {
            Self::UserMessage(_) => ConversationEvent::Send,
            Self::Reply { .. } => ConversationEvent::Reply,
            Self::Failure { .. } => ConversationEvent::Fail,
            Self::Clear => ConversationEvent::Clear,
        }
    }
}

/// Bounds applied to every conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Oldest messages are evicted once a conversation holds more than this
    pub max_messages: Option<usize>,
}

impl RegistryLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            max_messages: Some(max_messages),
        }
    }
}

/// Compute the conversation that results from applying `update` to `prior`
pub fn apply(
    prior: &Conversation,
    update: ConversationUpdate,
    limits: &RegistryLimits,
) -> Result<Conversation, StateError> {
    ConversationStateMachine::transition(prior.state(), update.event())?;

    let mut next = prior.clone();
    match update {
        ConversationUpdate::UserMessage(message) => {
            if message.sender != Sender::User || message.status != MessageStatus::Sending {
                return Err(StateError::GuardFailed(format!(
                    "expected a sending user message, got {} message with status {}",
                    message.sender, message.status
                )));
            }
            next.phase = ConversationPhase::Loading(message.id);
            next.messages.push(message);
            trim_history(&mut next, limits);
        }
        ConversationUpdate::Reply { request, text } => {
            ensure_outstanding(prior, request)?;
            mark_pending(&mut next, request, MessageEvent::Acknowledge)?;
            next.messages.push(Message::new_assistant(text));
            next.phase = ConversationPhase::Idle;
            trim_history(&mut next, limits);
        }
        ConversationUpdate::Failure { request, text } => {
            ensure_outstanding(prior, request)?;
            mark_pending(&mut next, request, MessageEvent::Fail)?;
            let text = if text.trim().is_empty() {
                DEFAULT_FAILURE_TEXT.to_string()
            } else {
                text
            };
            next.phase = ConversationPhase::Failed(text);
        }
        ConversationUpdate::Clear => {
            next = Conversation::new(prior.id.clone());
        }
    }

    Ok(next)
}

/// A resolution only applies to the request the conversation is waiting on
fn ensure_outstanding(prior: &Conversation, request: MessageId) -> Result<(), StateError> {
    if prior.pending_request() == Some(request) {
        return Ok(());
    }
    Err(StateError::GuardFailed(format!(
        "message {} is not the outstanding request",
        request
    )))
}

/// Move the pending user message along `event`
///
/// The message may already have been evicted by the history cap.
fn mark_pending(
    conversation: &mut Conversation,
    request: MessageId,
    event: MessageEvent,
) -> Result<(), StateError> {
    if let Some(message) = conversation.messages.iter_mut().find(|m| m.id == request) {
        message.status = MessageStatusMachine::transition(message.status, event)?;
    }
    Ok(())
}

fn trim_history(conversation: &mut Conversation, limits: &RegistryLimits) {
    if let Some(max) = limits.max_messages {
        let len = conversation.messages.len();
        if len > max {
            conversation.messages.drain(..len - max);
            tracing::debug!(
                conversation_id = %conversation.id,
                evicted = len - max,
                "Evicted oldest messages"
            );
        }
    }
}
