//! Route definitions for the RoastBot API.
//!
//! ## Routes
//!
//! - `GET /health` - Health check (JSON)
//! - `POST /api/generate-meme` - Render a captioned meme
//! - `POST /api/generate` - Generate roast or compliment text
//! - `POST /api/feedback` - Record a reaction
//! - `POST /api/track-share` - Record a share
//! - `GET /api/track-share` - Share totals
//! - `GET /api/templates` - Template catalog
//! - `POST /api/templates` - Upload a custom template

mod feedback;
mod generate;
mod health;
mod meme;
mod share;
mod templates;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::state::AppState;

pub use meme::MAX_TEXT_CHARS;

/// Build the complete API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/generate-meme", post(meme::generate_meme))
        .route("/api/generate", post(generate::generate_text))
        .route("/api/feedback", post(feedback::submit_feedback))
        .route(
            "/api/track-share",
            get(share::share_totals).post(share::track_share),
        )
        .route(
            "/api/templates",
            get(templates::list_templates).post(templates::upload_template).layer(
                DefaultBodyLimit::max(templates::UPLOAD_BODY_LIMIT),
            ),
        )
        .with_state(state)
}
