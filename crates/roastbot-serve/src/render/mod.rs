//! Meme rendering pipeline.
//!
//! ```text
//! ImageLoader ──► CanvasPlan ──► TextLayout ──► compositor ──► PNG
//!   (async I/O)        (blocking pool: decode, layout, draw, encode)
//! ```
//!
//! CPU-bound stages run on tokio's blocking pool so rendering never stalls
//! the request executor.

pub mod compositor;
pub mod encode;
pub mod layout;
pub mod loader;
pub mod text;

use std::sync::Arc;
use std::time::Instant;

use roastbot_core::{ContentType, RetryPolicy, metrics};

pub use layout::{CanvasPlan, MeasureText, TextLayout};
pub use loader::ImageLoader;
pub use text::FontFace;

/// Failures while producing a meme image.
#[derive(Debug, thiserror::Error)]
pub enum MemeError {
    /// The decoded image reports no usable dimensions.
    #[error("Invalid image data")]
    InvalidImage,

    #[error("Image dimensions too small ({width}x{height}, minimum {}px)", loader::MIN_SOURCE_SIDE)]
    ImageTooSmall { width: u32, height: u32 },

    #[error("Image dimensions too large ({width}x{height}, maximum {}px)", loader::MAX_SOURCE_SIDE)]
    ImageTooLarge { width: u32, height: u32 },

    /// An image source could not be read or decoded.
    #[error("failed to load {source_kind} image: {reason}")]
    ImageLoad {
        source_kind: &'static str,
        reason: String,
    },

    /// Drawing failed in a way the compositor could not recover from.
    #[error("render failed: {0}")]
    Render(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl MemeError {
    /// Load failures are retried and may fall through to the next source.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ImageLoad { .. })
    }
}

/// One meme to render.
#[derive(Debug, Clone, Copy)]
pub struct MemeRequest<'a> {
    pub text: &'a str,
    pub content_type: ContentType,
    pub image_data: Option<&'a str>,
    pub template: Option<&'a str>,
}

/// Loads, lays out, composites and encodes memes.
#[derive(Debug, Clone)]
pub struct MemeRenderer {
    loader: ImageLoader,
    font: FontFace,
    watermark: Arc<str>,
    retry: RetryPolicy,
}

impl MemeRenderer {
    pub fn new(loader: ImageLoader, font: FontFace, watermark: &str, retry: RetryPolicy) -> Self {
        Self {
            loader,
            font,
            watermark: Arc::from(watermark),
            retry,
        }
    }

    /// Render `request` to PNG bytes.
    pub async fn render(&self, request: &MemeRequest<'_>) -> Result<Vec<u8>, MemeError> {
        let started = Instant::now();

        let image = self
            .loader
            .load(request.image_data, request.template, request.content_type)
            .await?;
        let plan = CanvasPlan::for_image(image.width(), image.height());

        let font = self.font.clone();
        let watermark = Arc::clone(&self.watermark);
        let text = request.text.to_string();
        let pixmap = tokio::task::spawn_blocking(move || {
            let source = compositor::to_pixmap(&image)?;
            let layout = TextLayout::compute(plan, &text, &font);
            tracing::debug!(
                width = plan.width,
                height = plan.height,
                font_size = layout.font_size,
                lines = layout.lines.len(),
                "caption laid out"
            );
            compositor::composite(&source, plan, &layout, &font, &watermark)
        })
        .await??;

        let pixmap = Arc::new(pixmap);
        let png = self
            .retry
            .run(
                "encode_png",
                |err: &MemeError| matches!(err, MemeError::Encode(e) if encode::is_transient(e)),
                || {
                    let pixmap = Arc::clone(&pixmap);
                    async move {
                        tokio::task::spawn_blocking(move || encode::encode_png(&pixmap))
                            .await
                            .map_err(MemeError::from)
                            .and_then(|encoded| encoded.map_err(MemeError::from))
                    }
                },
            )
            .await?;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::increment("meme_renders_total", 1);
        metrics::observe_seconds("meme_render_duration_seconds", elapsed);
        tracing::debug!(
            width = plan.width,
            height = plan.height,
            bytes = png.len(),
            elapsed_ms = (elapsed * 1000.0) as u64,
            "meme rendered"
        );

        Ok(png)
    }
}
