//! Domain entities for the Conversations domain
//!
//! Messages are immutable once appended, apart from their delivery status.
//! A conversation's loading flag and error slot share one `ConversationPhase`,
//! and a loading phase names the user message its reply is awaited for.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gemchat_common::{Error, Result};

use super::state::ConversationState;

/// Opaque identifier of a chat, chosen by whoever selects it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a chat the user has just opened
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message identifier; UUIDv7 so ids sort by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// Delivery status of a message
///
/// Variants are declared in forward order; see `MessageStatusMachine`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sending,
    Sent,
    Delivered,
    Read,
    Error,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Sending => write!(f, "sending"),
            MessageStatus::Sent => write!(f, "sent"),
            MessageStatus::Delivered => write!(f, "delivered"),
            MessageStatus::Read => write!(f, "read"),
            MessageStatus::Error => write!(f, "error"),
        }
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    /// Create a new user message, pending delivery
    pub fn new_user(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::Validation(
                "Message text cannot be empty or whitespace-only".to_string(),
            ));
        }

        Ok(Message {
            id: MessageId::new(),
            text,
            sender: Sender::User,
            created_at: Utc::now(),
            status: MessageStatus::Sending,
        })
    }

    /// Create an assistant reply; replies arrive already delivered
    pub fn new_assistant(text: impl Into<String>) -> Self {
        Message {
            id: MessageId::new(),
            text: text.into(),
            sender: Sender::Assistant,
            created_at: Utc::now(),
            status: MessageStatus::Delivered,
        }
    }

    /// Creation time as shown in the transcript
    pub fn timestamp(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Loading flag and error slot of a conversation, as one value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", content = "detail", rename_all = "lowercase")]
pub enum ConversationPhase {
    #[default]
    Idle,
    /// Awaiting the reply to this user message
    Loading(MessageId),
    Failed(String),
}

impl ConversationPhase {
    pub fn state(&self) -> ConversationState {
        match self {
            ConversationPhase::Idle => ConversationState::Idle,
            ConversationPhase::Loading(_) => ConversationState::Loading,
            ConversationPhase::Failed(_) => ConversationState::Failed,
        }
    }
}

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub(crate) messages: Vec<Message>,
    pub(crate) phase: ConversationPhase,
}

impl Conversation {
    /// Create an empty, idle conversation
    pub fn new(id: ConversationId) -> Self {
        Conversation {
            id,
            messages: Vec::new(),
            phase: ConversationPhase::Idle,
        }
    }

    /// Messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> &ConversationPhase {
        &self.phase
    }

    pub fn state(&self) -> ConversationState {
        self.phase.state()
    }

    /// True while a reply is outstanding
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, ConversationPhase::Loading(_))
    }

    /// The user message whose reply is outstanding
    pub fn pending_request(&self) -> Option<MessageId> {
        match self.phase {
            ConversationPhase::Loading(request) => Some(request),
            _ => None,
        }
    }

    /// The active error, if the last request failed
    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            ConversationPhase::Failed(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
