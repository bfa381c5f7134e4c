//! State machines for the Conversations domain
//!
//! Message delivery status: Sending → {Sent | Delivered | Read | Error}, only forward.
//! Conversation: Idle ⇄ Loading → Failed, with Clear returning anything to Idle.

pub use gemchat_common::StateError;

use super::entities::MessageStatus;
use serde::{Deserialize, Serialize};

// ============================================================================
// Message Status State Machine
// ============================================================================

impl MessageStatus {
    /// Check if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Read | Self::Error)
    }

    /// Get all valid next statuses from the current one
    pub fn valid_transitions(&self) -> &'static [MessageStatus] {
        match self {
            Self::Sending => &[Self::Sent, Self::Delivered, Self::Read, Self::Error],
            Self::Sent => &[Self::Delivered, Self::Read, Self::Error],
            Self::Delivered => &[Self::Read],
            Self::Read => &[],
            Self::Error => &[],
        }
    }
}

/// Events that move a message's delivery status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEvent {
    /// The remote service accepted the message
    Acknowledge,
    /// A reply to the message arrived
    Deliver,
    /// The user has seen the reply
    MarkRead,
    /// The send attempt failed
    Fail,
}

impl MessageEvent {
    fn target(&self) -> MessageStatus {
        match self {
            Self::Acknowledge => MessageStatus::Sent,
            Self::Deliver => MessageStatus::Delivered,
            Self::MarkRead => MessageStatus::Read,
            Self::Fail => MessageStatus::Error,
        }
    }
}

impl std::fmt::Display for MessageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acknowledge => write!(f, "acknowledge"),
            Self::Deliver => write!(f, "deliver"),
            Self::MarkRead => write!(f, "mark_read"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Message status state machine
pub struct MessageStatusMachine;

impl MessageStatusMachine {
    /// Attempt a status transition
    pub fn transition(current: MessageStatus, event: MessageEvent) -> Result<MessageStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = event.target();
        if !current.valid_transitions().contains(&next) {
            return Err(StateError::invalid(current, event));
        }

        Ok(next)
    }
}

// ============================================================================
// Conversation State Machine
// ============================================================================

/// Request lifecycle of a conversation
///
/// `Loading` is the loading flag; `Failed` is a filled error slot. Being a
/// single state, the two can never hold at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    Idle,
    Loading,
    Failed,
}

impl ConversationState {
    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [ConversationState] {
        match self {
            Self::Idle => &[Self::Loading, Self::Idle],
            Self::Loading => &[Self::Idle, Self::Failed],
            Self::Failed => &[Self::Loading, Self::Idle],
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Events that trigger conversation state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A user message was appended and a reply requested
    Send,
    /// The reply arrived
    Reply,
    /// The request failed
    Fail,
    /// The conversation was cleared
    Clear,
}

impl std::fmt::Display for ConversationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Reply => write!(f, "reply"),
            Self::Fail => write!(f, "fail"),
            Self::Clear => write!(f, "clear"),
        }
    }
}

/// Conversation state machine
pub struct ConversationStateMachine;

impl ConversationStateMachine {
    /// Attempt a state transition
    pub fn transition(
        current: ConversationState,
        event: ConversationEvent,
    ) -> Result<ConversationState, StateError> {
        let next = match (&current, &event) {
            (_, ConversationEvent::Clear) => ConversationState::Idle,

            (ConversationState::Idle, ConversationEvent::Send)
            | (ConversationState::Failed, ConversationEvent::Send) => ConversationState::Loading,

            (ConversationState::Loading, ConversationEvent::Reply) => ConversationState::Idle,
            (ConversationState::Loading, ConversationEvent::Fail) => ConversationState::Failed,

            _ => return Err(StateError::invalid(current, event)),
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: ConversationState, event: ConversationEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
