//! Template catalog listing and custom template upload.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use crate::templates::{self, MemeTemplate, TemplateQuery};
use crate::upload::{self, UploadError};

/// Request bodies above this are rejected before parsing. Leaves room for
/// base64 overhead on a 5MB image.
pub const UPLOAD_BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    templates: Vec<&'static MemeTemplate>,
}

/// `GET /api/templates?type=&search=&style=&theme=`
pub async fn list_templates(
    query: Result<Query<TemplateQuery>, QueryRejection>,
) -> Result<Json<TemplatesResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    Ok(Json(TemplatesResponse {
        templates: templates::filter(&query),
    }))
}

/// Where an uploaded template came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Custom,
    Imgflip,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    name: String,
    #[serde(rename = "type")]
    kind: UploadKind,
    tags: Vec<String>,
    box_count: u32,
    captions: Vec<String>,
    image_data: String,
}

impl UploadBody {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name: must not be empty".to_string()));
        }
        if self.box_count == 0 {
            return Err(ApiError::Validation("boxCount: must be at least 1".to_string()));
        }
        if !self.image_data.starts_with("data:image/") {
            return Err(ApiError::Validation(
                "imageData: must be a data:image/ URL".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metadata of a stored upload; the image itself is not echoed back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedTemplate {
    name: String,
    #[serde(rename = "type")]
    kind: UploadKind,
    tags: Vec<String>,
    box_count: u32,
    captions: Vec<String>,
    filename: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    success: bool,
    template: UploadedTemplate,
}

/// `POST /api/templates`
///
/// Stores the image as a JPEG in the template directory. The returned
/// `filename` can be passed as `template` to `/api/generate-meme`.
pub async fn upload_template(
    State(state): State<AppState>,
    payload: Result<Json<UploadBody>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Json(body) = payload?;
    body.validate()?;

    let UploadBody {
        name,
        kind,
        tags,
        box_count,
        captions,
        image_data,
    } = body;

    let processed = tokio::task::spawn_blocking(move || upload::process_upload(&image_data))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    let filename = upload::upload_filename(chrono::Utc::now().timestamp_millis(), &name);
    state
        .templates
        .save(&filename, &processed.jpeg)
        .await
        .map_err(UploadError::from)?;

    tracing::info!(
        filename = %filename,
        width = processed.width,
        height = processed.height,
        bytes = processed.jpeg.len(),
        "template uploaded"
    );

    Ok(Json(UploadResponse {
        success: true,
        template: UploadedTemplate {
            name,
            kind,
            tags,
            box_count,
            captions,
            filename,
            width: processed.width,
            height: processed.height,
        },
    }))
}
