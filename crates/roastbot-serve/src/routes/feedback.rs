//! Reaction feedback endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use roastbot_core::analytics::{FeedbackEvent, FeedbackSummary, PromptStats};
use roastbot_core::{ContentType, Reaction, metrics};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    content_id: String,
    #[serde(rename = "type")]
    content_type: ContentType,
    reaction: Reaction,
    prompt_used: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    success: bool,
    analytics: FeedbackSummary,
    /// Running totals for the follow-up prompt, when the event named one.
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_stats: Option<PromptStats>,
}

/// `POST /api/feedback`
pub async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackBody>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let Json(body) = payload?;

    let event = FeedbackEvent {
        content_id: body.content_id,
        content_type: body.content_type,
        reaction: body.reaction,
        prompt_used: body.prompt_used,
    };
    let analytics = state
        .analytics
        .record_feedback(&event)
        .await
        .map_err(|source| ApiError::Analytics {
            message: "Failed to process feedback",
            source,
        })?;

    metrics::increment_labeled("feedback_total", "reaction", event.reaction.as_str());
    tracing::info!(
        content_id = %event.content_id,
        content_type = %event.content_type,
        reaction = %event.reaction,
        total = analytics.total,
        "feedback received"
    );

    let prompt_stats = match event.prompt_used.as_deref() {
        Some(prompt) => state
            .analytics
            .prompt_stats(prompt)
            .await
            .map_err(|source| ApiError::Analytics {
                message: "Failed to process feedback",
                source,
            })?,
        None => None,
    };

    Ok(Json(FeedbackResponse {
        success: true,
        analytics,
        prompt_stats,
    }))
}
