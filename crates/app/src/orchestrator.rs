//! Turns one appended user message into exactly one completion call

use gemchat_conversations::{CompletionOutcome, FailureKind, SendFailure};
use gemchat_llm::{CompletionRequest, LlmError, LlmService};
use gemchat_settings::Settings;

pub const MISSING_API_KEY: &str = "API key is required";
pub const MISSING_MODEL: &str = "Model is required";

/// Request a reply for `prompt` with the given settings
///
/// Missing settings fail without any network call. Never retries.
pub async fn request_completion(
    llm: &dyn LlmService,
    settings: &Settings,
    prompt: &str,
) -> CompletionOutcome {
    let Some(api_key) = settings.api_key() else {
        return Err(SendFailure::missing_credential(MISSING_API_KEY));
    };
    let Some(model) = settings.model() else {
        return Err(SendFailure::missing_credential(MISSING_MODEL));
    };

    tracing::debug!(provider = llm.provider(), model = %model, "Requesting completion");
    llm.complete(CompletionRequest::new(prompt, api_key, model))
        .await
        .map_err(send_failure)
}

/// Fold a client error into the failure shown on the conversation
pub fn send_failure(err: LlmError) -> SendFailure {
    let kind = match &err {
        LlmError::Configuration(_) | LlmError::Transport(_) => FailureKind::Transport,
        LlmError::Api { .. } => FailureKind::Api,
        LlmError::MalformedResponse(_) => FailureKind::MalformedResponse,
    };
    SendFailure::new(kind, err.to_string())
}
