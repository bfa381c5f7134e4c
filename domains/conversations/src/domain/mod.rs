//! Conversations domain layer: entities, state machines, pure transitions

pub mod entities;
pub mod outcome;
pub mod state;
pub mod transition;
