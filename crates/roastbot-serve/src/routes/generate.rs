//! Roast and compliment text generation endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use roastbot_core::ContentType;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::generate::{GenerateOptions, GenerationError, GenerationInput, Severity, Style};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum InputType {
    Text,
    Image,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    #[serde(rename = "type")]
    content_type: ContentType,
    input_type: InputType,
    text: Option<String>,
    image_data: Option<String>,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    style: Style,
}

impl GenerateBody {
    fn into_options(self) -> Result<GenerateOptions, ApiError> {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        let input = match self.input_type {
            InputType::Text => non_empty(self.text)
                .map(GenerationInput::Text)
                .ok_or(ApiError::BadRequest("Text input required for text mode"))?,
            InputType::Image => non_empty(self.image_data)
                .map(GenerationInput::Image)
                .ok_or(ApiError::BadRequest("Image data required for image mode"))?,
        };
        Ok(GenerateOptions {
            content_type: self.content_type,
            input,
            severity: self.severity,
            style: self.style,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    generated_text: String,
}

/// `POST /api/generate`
pub async fn generate_text(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = payload?;
    let options = body.into_options()?;

    let generator = state
        .generator
        .as_ref()
        .ok_or(GenerationError::NotConfigured)?;
    let generated_text = generator.generate(&options).await?;

    Ok(Json(GenerateResponse { generated_text }))
}
