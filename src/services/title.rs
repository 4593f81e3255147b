//! Chat title generation
//!
//! Produces a short descriptive title from the first user message of a
//! conversation, using the same gateway as regular completions. Intended
//! to run in the background after a chat starts; the spawned handle is
//! awaitable so callers can join it when they need the result.

use crate::models::{ChatMessage, CompletionOutcome};
use crate::services::gateway::CompletionGateway;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Title returned when generation fails or yields nothing usable
pub const FALLBACK_TITLE: &str = "New chat";

const TITLE_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates concise, \
descriptive chat titles (3-6 words) based on the user's first message. Respond only with \
the title, no additional text or punctuation.";

/// Build the two-message prompt used for title generation
pub fn build_title_prompt(first_message: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(TITLE_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Generate a concise title for a chat that starts with this message: \"{}\"",
            first_message
        )),
    ]
}

/// Generate a title for a chat that starts with `first_message`
///
/// Never fails: any gateway failure or empty response falls back to
/// [`FALLBACK_TITLE`]. Surrounding whitespace and double quotes are
/// stripped from the model output, matching the post-processing applied
/// to streamed messages.
pub async fn generate_chat_title(
    gateway: &CompletionGateway,
    first_message: &str,
    model_id: &str,
) -> String {
    let prompt = build_title_prompt(first_message);

    match gateway.complete(&prompt, model_id, None).await {
        CompletionOutcome::Success { message, .. } => {
            let title = message.trim().replace('"', "");
            if title.is_empty() {
                debug!("Title generation returned empty output, using fallback");
                FALLBACK_TITLE.to_string()
            } else {
                title
            }
        }
        CompletionOutcome::Failure { error } => {
            warn!("Title generation failed: {}", error);
            FALLBACK_TITLE.to_string()
        }
    }
}

/// Spawn title generation as a background task
///
/// The returned handle resolves to the title; callers that do not need
/// it may simply drop the handle and let the task run to completion.
pub fn spawn_title_generation(
    gateway: Arc<CompletionGateway>,
    first_message: String,
    model_id: String,
) -> JoinHandle<String> {
    tokio::spawn(async move { generate_chat_title(&gateway, &first_message, &model_id).await })
}
