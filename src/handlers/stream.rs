//! Chat completion handlers
//!
//! The streaming endpoint relays upstream token deltas as the normalized
//! SSE frame protocol; the non-streaming endpoint returns the completion
//! outcome as a single JSON body.

use crate::handlers::AppState;
use crate::models::chat::{ChatMessage, CompletionOutcome, TokenUsage};
use crate::models::wire::StreamFrame;
use crate::utils::error::AppError;
use crate::utils::logging::create_completion_log_summary;
use axum::response::sse::{Event, KeepAlive};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response, Sse},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};
use uuid::Uuid;

/// Chat completion request body
///
/// `modelId` defaults to the configured default model; `apiKey` carries
/// the caller's vendor key for BYOK models and is ignored otherwise.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "modelId")]
    pub model_id: Option<String>,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

/// Non-streaming completion response body
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CompleteResponse {
    Success {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
    },
    Failure {
        error: String,
    },
}

fn validate_chat_request(request: &ChatRequest) -> Result<(), AppError> {
    if request.messages.is_empty() {
        return Err(AppError::Validation("Message list cannot be empty".to_string()));
    }

    if request.messages.iter().any(|msg| msg.content.trim().is_empty()) {
        return Err(AppError::Validation("Message content cannot be empty".to_string()));
    }

    Ok(())
}

/// Handle streaming chat completions
///
/// POST /api/chat/stream
///
/// Failures before the first upstream token (unroutable model, BYOK
/// streaming, exhausted retries) return a JSON `{ "error": ... }` body
/// with a non-OK status. Once streaming has started, failures surface as
/// a terminal error frame inside the SSE stream instead.
pub async fn handle_chat_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    validate_chat_request(&request)?;

    let model_id = request
        .model_id
        .unwrap_or_else(|| state.settings.openrouter.default_model.clone());

    let request_id = Uuid::new_v4();
    let summary = create_completion_log_summary(&request.messages, &model_id);
    debug!("[{}] Received streaming chat request: {}", request_id, summary);

    let upstream = state.gateway.complete_stream(&request.messages, &model_id).await?;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, axum::Error>>(100);

    tokio::spawn(async move {
        let mut upstream = upstream;
        let mut full_message = String::new();

        while let Some(delta) = upstream.next().await {
            match delta {
                Ok(content) => {
                    if content.is_empty() {
                        continue;
                    }

                    full_message.push_str(&content);
                    let frame = StreamFrame::chunk(content, full_message.clone());

                    if tx.send(Ok(frame_event(&frame))).await.is_err() {
                        debug!("Client disconnected");
                        return;
                    }
                }
                Err(e) => {
                    error!("[{}] Upstream streaming error: {}", request_id, e);
                    let frame = StreamFrame::error("Error processing streaming response");
                    let _ = tx.send(Ok(frame_event(&frame))).await;
                    return;
                }
            }
        }

        let frame = StreamFrame::done(&full_message);
        let _ = tx.send(Ok(frame_event(&frame))).await;
    });

    let stream = ReceiverStream::new(rx);
    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    );

    debug!("[{}] Starting streaming response transmission", request_id);
    Ok(([(header::CACHE_CONTROL, "no-cache")], sse).into_response())
}

/// Encode a frame as an SSE event
///
/// The `data: ` prefix and trailing blank line are added by the SSE
/// writer; only the JSON payload goes into the event.
fn frame_event(frame: &StreamFrame) -> Event {
    // Frame fields are plain strings, serialization cannot fail
    let json = serde_json::to_string(frame).unwrap_or_default();
    Event::default().data(json)
}

/// Handle preflight requests for the streaming endpoint
///
/// OPTIONS /api/chat/stream
pub async fn handle_stream_preflight() -> StatusCode {
    StatusCode::OK
}

/// Handle non-streaming chat completions
///
/// POST /api/chat/complete
///
/// Expected provider failures (missing BYOK key, exhausted retries,
/// unknown model) come back as a 200 with an `{ "error": ... }` body:
/// the outcome shape is the contract, not the status code.
pub async fn handle_chat_complete(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    validate_chat_request(&request)?;

    let model_id = request
        .model_id
        .unwrap_or_else(|| state.settings.openrouter.default_model.clone());

    let summary = create_completion_log_summary(&request.messages, &model_id);
    debug!("Received chat completion request: {}", summary);

    let outcome = state
        .gateway
        .complete(&request.messages, &model_id, request.api_key.as_deref())
        .await;

    let response = match outcome {
        CompletionOutcome::Success { message, usage } => {
            CompleteResponse::Success { message, usage }
        }
        CompletionOutcome::Failure { error } => CompleteResponse::Failure { error },
    };

    Ok(Json(response))
}
