//! Share tracking endpoints.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use roastbot_core::analytics::{ShareEvent, ShareSummary, ShareTotals};
use roastbot_core::{ContentType, SharePlatform, metrics};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

const TRACK_FAILED: &str = "Failed to track share";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareBody {
    #[serde(rename = "type")]
    content_type: ContentType,
    platform: SharePlatform,
    meme_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackShareResponse {
    success: bool,
    analytics: ShareSummary,
}

#[derive(Debug, Serialize)]
pub struct ShareTotalsResponse {
    analytics: ShareTotals,
}

/// `POST /api/track-share`
pub async fn track_share(
    State(state): State<AppState>,
    payload: Result<Json<ShareBody>, JsonRejection>,
) -> Result<Json<TrackShareResponse>, ApiError> {
    let Json(body) = payload?;

    let event = ShareEvent {
        content_type: body.content_type,
        platform: body.platform,
        meme_id: body.meme_id,
    };
    let analytics = state
        .analytics
        .record_share(&event)
        .await
        .map_err(|source| ApiError::Analytics {
            message: TRACK_FAILED,
            source,
        })?;

    metrics::increment_labeled("shares_total", "platform", event.platform.as_str());
    if analytics.is_viral {
        tracing::info!(total = analytics.total, "share total reached viral threshold");
    }

    Ok(Json(TrackShareResponse {
        success: true,
        analytics,
    }))
}

/// `GET /api/track-share`
pub async fn share_totals(
    State(state): State<AppState>,
) -> Result<Json<ShareTotalsResponse>, ApiError> {
    let analytics = state
        .analytics
        .share_totals()
        .await
        .map_err(|source| ApiError::Analytics {
            message: TRACK_FAILED,
            source,
        })?;
    Ok(Json(ShareTotalsResponse { analytics }))
}
