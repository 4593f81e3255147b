//! Chat title handler
//!
//! Generates a short title for a new conversation

use crate::handlers::AppState;
use crate::services::title::spawn_title_generation;
use crate::services::FALLBACK_TITLE;
use crate::utils::error::AppError;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Title generation request body
#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    /// The first user message of the conversation
    #[serde(rename = "firstMessage")]
    pub first_message: String,
    #[serde(rename = "modelId")]
    pub model_id: Option<String>,
}

/// Title generation response body
#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub title: String,
}

/// Handle chat title generation
///
/// POST /api/chat/title
///
/// Runs generation as a background task and awaits the handle, so the
/// same task shape serves both fire-and-forget and awaited callers.
/// Always returns a usable title; failures degrade to the fallback.
pub async fn handle_chat_title(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TitleRequest>,
) -> Result<Json<TitleResponse>, AppError> {
    if request.first_message.trim().is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }

    let model_id = request
        .model_id
        .unwrap_or_else(|| state.settings.openrouter.default_model.clone());

    debug!("Generating title with model: {}", model_id);

    let handle =
        spawn_title_generation(Arc::clone(&state.gateway), request.first_message, model_id);

    let title = match handle.await {
        Ok(title) => title,
        Err(e) => {
            warn!("Title generation task failed: {}", e);
            FALLBACK_TITLE.to_string()
        }
    };

    Ok(Json(TitleResponse { title }))
}
