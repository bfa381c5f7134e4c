//! Result of one completion attempt, as seen by the registry

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a send failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No API key or model configured; no request was made
    MissingCredential,
    Transport,
    Api,
    MalformedResponse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::MissingCredential => write!(f, "missing_credential"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Api => write!(f, "api"),
            FailureKind::MalformedResponse => write!(f, "malformed_response"),
        }
    }
}

/// A failed send: the kind for logs, the detail for the error slot
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{detail}")]
pub struct SendFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl SendFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn missing_credential(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::MissingCredential, detail)
    }
}

/// `Ok(reply)` or the failure that ended the request
pub type CompletionOutcome = Result<String, SendFailure>;
