//! Conversations domain: chat threads, messages, and the registry that owns them

pub mod domain;
pub mod registry;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{
    Conversation, ConversationId, ConversationPhase, Message, MessageId, MessageStatus, Sender,
};
pub use domain::outcome::{CompletionOutcome, FailureKind, SendFailure};
pub use domain::state::{
    ConversationEvent, ConversationState, ConversationStateMachine, MessageEvent,
    MessageStatusMachine, StateError,
};
pub use domain::transition::{apply, ConversationUpdate, RegistryLimits};

// Re-export registry types
pub use registry::{ConversationMap, ConversationRegistry, RegistryError};
