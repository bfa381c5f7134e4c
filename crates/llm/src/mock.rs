//! Mock Completion Service Implementation
//!
//! Programmable mock for testing send workflows:
//! - `MockLlmService`: configurable mock with request recording
//! - `MockBehavior`: controls outcome, per-prompt delays and the model list
//! - `MockOutcome`: Echo, Reply, ApiError, TransportError or Malformed

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::{CompletionRequest, LlmError, LlmService, ModelInfo};

/// What outcome the mock should produce
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MockOutcome {
    /// Reply with "Mock response to: {prompt}"
    #[default]
    Echo,
    /// Reply with fixed text
    Reply(String),
    /// Fail as if the API returned a non-success status
    ApiError { status: u16, message: String },
    /// Fail as if the network was unreachable
    TransportError(String),
    /// Fail as if the reply path was missing
    Malformed,
}

/// Programmable behavior for the mock completion service
#[derive(Debug, Default)]
pub struct MockBehavior {
    outcome: RwLock<MockOutcome>,
    delays: RwLock<HashMap<String, u64>>,
    models: RwLock<Vec<ModelInfo>>,
}

impl MockBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock outcome
    pub fn set_outcome(&self, outcome: MockOutcome) {
        *self.outcome.write().expect("outcome lock poisoned") = outcome;
    }

    /// Delay the reply for one prompt, to interleave concurrent sends
    pub fn set_prompt_delay_ms(&self, prompt: impl Into<String>, delay: u64) {
        self.delays
            .write()
            .expect("delays lock poisoned")
            .insert(prompt.into(), delay);
    }

    /// Configure the model list returned by `list_models`
    pub fn set_models(&self, models: Vec<ModelInfo>) {
        *self.models.write().expect("models lock poisoned") = models;
    }

    /// Reset to default behavior
    pub fn reset(&self) {
        *self.outcome.write().expect("outcome lock poisoned") = MockOutcome::Echo;
        self.delays.write().expect("delays lock poisoned").clear();
        self.models.write().expect("models lock poisoned").clear();
    }

    /// Read current outcome
    pub fn outcome(&self) -> MockOutcome {
        self.outcome.read().expect("outcome lock poisoned").clone()
    }

    fn delay_for(&self, prompt: &str) -> Option<u64> {
        self.delays
            .read()
            .ok()
            .and_then(|delays| delays.get(prompt).copied())
    }
}

/// Mock completion service with programmable behavior
#[derive(Debug, Clone, Default)]
pub struct MockLlmService {
    behavior: Arc<MockBehavior>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    model_list_calls: Arc<Mutex<usize>>,
}

impl MockLlmService {
    /// Create a new mock completion service
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the shared behavior for configuration from tests
    pub fn behavior(&self) -> &Arc<MockBehavior> {
        &self.behavior
    }

    /// Return all recorded completion requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .expect("requests lock poisoned by a prior test panic")
            .clone()
    }

    /// Number of times the model list was requested
    pub fn model_list_calls(&self) -> usize {
        *self
            .model_list_calls
            .lock()
            .expect("model list counter poisoned by a prior test panic")
    }

    /// Clear recorded requests
    pub fn reset_history(&self) {
        self.requests
            .lock()
            .expect("requests lock poisoned by a prior test panic")
            .clear();
    }
}

#[async_trait::async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        tracing::debug!(model = %request.model, "Mock completion: recording request");

        self.requests
            .lock()
            .map_err(|e| LlmError::Transport(format!("requests lock poisoned: {e}")))?
            .push(request.clone());

        if let Some(delay) = self.behavior.delay_for(&request.prompt) {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match self.behavior.outcome() {
            MockOutcome::Echo => Ok(format!("Mock response to: {}", request.prompt)),
            MockOutcome::Reply(text) => Ok(text),
            MockOutcome::ApiError { status, message } => Err(LlmError::Api { status, message }),
            MockOutcome::TransportError(message) => Err(LlmError::Transport(message)),
            MockOutcome::Malformed => Err(LlmError::MalformedResponse(
                "Response contained no candidate text".to_string(),
            )),
        }
    }

    async fn list_models(&self, _api_key: &str) -> Result<Vec<ModelInfo>, LlmError> {
        let mut calls = self
            .model_list_calls
            .lock()
            .map_err(|e| LlmError::Transport(format!("model list counter poisoned: {e}")))?;
        *calls += 1;

        Ok(self
            .behavior
            .models
            .read()
            .map_err(|e| LlmError::Transport(format!("models lock poisoned: {e}")))?
            .clone())
    }

    fn provider(&self) -> &str {
        "mock"
    }
}
