//! Meme generation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use base64::Engine;
use roastbot_core::ContentType;
use serde::{Deserialize, Serialize};

use crate::cache;
use crate::error::ApiError;
use crate::render::MemeRequest;
use crate::state::AppState;

/// Longest accepted caption, in characters.
pub const MAX_TEXT_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeBody {
    text: String,
    #[serde(rename = "type")]
    content_type: ContentType,
    image_data: Option<String>,
    template: Option<String>,
}

impl MemeBody {
    fn validate(&self) -> Result<(), ApiError> {
        if self.text.chars().count() > MAX_TEXT_CHARS {
            return Err(ApiError::Validation(format!(
                "text: must be at most {MAX_TEXT_CHARS} characters"
            )));
        }
        if self
            .image_data()
            .is_some_and(|data| !data.starts_with("data:image/"))
        {
            return Err(ApiError::Validation(
                "imageData: must be a data:image/ URL".to_string(),
            ));
        }
        Ok(())
    }

    fn image_data(&self) -> Option<&str> {
        self.image_data.as_deref().filter(|s| !s.is_empty())
    }

    fn template(&self) -> Option<&str> {
        self.template.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeResponse {
    image_url: String,
    from_cache: bool,
}

impl MemeResponse {
    fn new(png: &[u8], from_cache: bool) -> Self {
        Self {
            image_url: format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(png)
            ),
            from_cache,
        }
    }
}

/// `POST /api/generate-meme`
///
/// Serves from the result cache when possible; otherwise renders, caches and
/// returns the PNG as a data URL.
pub async fn generate_meme(
    State(state): State<AppState>,
    payload: Result<Json<MemeBody>, JsonRejection>,
) -> Result<Json<MemeResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;

    let key = cache::fingerprint(
        &body.text,
        body.content_type,
        body.image_data(),
        body.template(),
    );

    if let Some(png) = state.cache.get(&key).await {
        tracing::debug!(content_type = %body.content_type, "meme cache hit");
        return Ok(Json(MemeResponse::new(&png, true)));
    }

    tracing::debug!(content_type = %body.content_type, "meme cache miss, rendering");

    let request = MemeRequest {
        text: &body.text,
        content_type: body.content_type,
        image_data: body.image_data(),
        template: body.template(),
    };
    let png = Arc::new(state.renderer.render(&request).await?);
    state.cache.insert(key, Arc::clone(&png)).await;

    Ok(Json(MemeResponse::new(&png, false)))
}
