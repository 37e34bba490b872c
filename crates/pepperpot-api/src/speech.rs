use axum::{Json, extract::State};
use tracing::debug;

use pepperpot_providers::{audio_data_url, step_narration};
use pepperpot_types::api::{SpeechRequest, SpeechResponse};

use crate::auth::non_empty;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

/// Narrates text as MP3. Rate limiting is applied by the route layer.
pub async fn generate(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SpeechRequest>,
) -> Result<Json<SpeechResponse>, ApiError> {
    let text = non_empty(req.text).ok_or_else(|| ApiError::validation("Text is required"))?;
    let speech = state
        .speech
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Text-to-speech is not configured".into()))?;

    let narration = match req.step_number {
        Some(n) => step_narration(n, &text),
        None => text,
    };
    debug!(chars = narration.len(), "Synthesizing speech");

    let audio = speech
        .synthesize(&narration, req.voice.as_deref())
        .await
        .map_err(|e| ApiError::external("Failed to generate speech", e))?;

    Ok(Json(SpeechResponse {
        audio: audio_data_url(&audio),
        provider: speech.provider_name().to_string(),
    }))
}
