//! Source image loading with retry and fallback.
//!
//! Sources are tried in order: inline data URL, named template, then the
//! content type's default template. Transient load failures are retried
//! under the configured policy before moving to the next source; dimension
//! failures are returned immediately.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use image::RgbaImage;
use roastbot_core::{ContentType, RetryPolicy};

use super::MemeError;
use crate::templates::{TemplateLocation, TemplateStore};

/// Smallest accepted source side, inclusive.
pub const MIN_SOURCE_SIDE: u32 = 50;

/// Largest accepted source side, inclusive.
pub const MAX_SOURCE_SIDE: u32 = 5000;

/// Remote template fetch limits.
const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);
const REMOTE_MAX_BYTES: usize = 5_000_000;

/// Reject images outside `[MIN_SOURCE_SIDE, MAX_SOURCE_SIDE]` on either side.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), MemeError> {
    if width == 0 || height == 0 {
        return Err(MemeError::InvalidImage);
    }
    if width < MIN_SOURCE_SIDE || height < MIN_SOURCE_SIDE {
        return Err(MemeError::ImageTooSmall { width, height });
    }
    if width > MAX_SOURCE_SIDE || height > MAX_SOURCE_SIDE {
        return Err(MemeError::ImageTooLarge { width, height });
    }
    Ok(())
}

/// Extract the payload of a `data:image/...;base64,` URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, MemeError> {
    let load_err = |reason: String| MemeError::ImageLoad {
        source_kind: "inline",
        reason,
    };

    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| load_err("not a data URL".to_string()))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(load_err(format!("unsupported data URL header {header:?}")));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| load_err(format!("invalid base64: {e}")))
}

/// Decode image bytes, checking dimensions before the full decode.
fn decode_image(bytes: &[u8], source_kind: &'static str) -> Result<RgbaImage, MemeError> {
    let load_err = |reason: String| MemeError::ImageLoad {
        source_kind,
        reason,
    };

    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| load_err(e.to_string()))?
        .into_dimensions()
        .map_err(|e| load_err(e.to_string()))?;
    validate_dimensions(width, height)?;

    let decoded = image::load_from_memory(bytes).map_err(|e| load_err(e.to_string()))?;
    Ok(decoded.to_rgba8())
}

#[derive(Debug, Clone, Copy)]
enum Source<'a> {
    Inline(&'a str),
    Template(&'a str),
    Default(ContentType),
}

impl Source<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Inline(_) => "inline",
            Self::Template(_) => "template",
            Self::Default(_) => "default",
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Inline(_) => "load_inline_image",
            Self::Template(_) => "load_template",
            Self::Default(_) => "load_default_template",
        }
    }
}

/// Resolves request image inputs to decoded RGBA images.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    templates: TemplateStore,
    retry: RetryPolicy,
    http: reqwest::Client,
}

impl ImageLoader {
    pub fn new(templates: TemplateStore, retry: RetryPolicy) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REMOTE_TIMEOUT).build()?;
        Ok(Self {
            templates,
            retry,
            http,
        })
    }

    /// Load the first usable image among the inline payload, the named
    /// template and the default template for `content_type`.
    pub async fn load(
        &self,
        inline: Option<&str>,
        template: Option<&str>,
        content_type: ContentType,
    ) -> Result<RgbaImage, MemeError> {
        let candidates = [inline.map(Source::Inline), template.map(Source::Template)];

        for source in candidates.into_iter().flatten() {
            match self.load_with_retry(source, self.retry).await {
                Ok(image) => return Ok(image),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(source = source.kind(), error = %err, "image source failed, falling back");
                    metrics::counter!("meme_image_fallbacks_total", "source" => source.kind())
                        .increment(1);
                }
                Err(err) => return Err(err),
            }
        }

        self.load_with_retry(Source::Default(content_type), RetryPolicy::none())
            .await
    }

    async fn load_with_retry(
        &self,
        source: Source<'_>,
        policy: RetryPolicy,
    ) -> Result<RgbaImage, MemeError> {
        policy
            .run(source.operation(), MemeError::is_retryable, || self.load_once(source))
            .await
    }

    async fn load_once(&self, source: Source<'_>) -> Result<RgbaImage, MemeError> {
        let bytes = match source {
            Source::Inline(data_url) => decode_data_url(data_url)?,
            Source::Template(reference) => match self.templates.resolve(reference)? {
                TemplateLocation::File(path) => read_file(&path, "template").await?,
                TemplateLocation::Remote(url) => self.fetch_remote(&url).await?,
            },
            Source::Default(content_type) => {
                read_file(&self.templates.default_path(content_type), "default").await?
            }
        };

        let kind = source.kind();
        tokio::task::spawn_blocking(move || decode_image(&bytes, kind)).await?
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, MemeError> {
        let load_err = |reason: String| MemeError::ImageLoad {
            source_kind: "template",
            reason,
        };

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| load_err(format!("fetch failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(load_err(format!("fetch returned {}", resp.status())));
        }
        if resp
            .content_length()
            .is_some_and(|len| len > REMOTE_MAX_BYTES as u64)
        {
            return Err(load_err("remote template exceeds 5MB".to_string()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| load_err(format!("read failed: {e}")))?;
        if bytes.len() > REMOTE_MAX_BYTES {
            return Err(load_err("remote template exceeds 5MB".to_string()));
        }
        Ok(bytes.to_vec())
    }
}

/// Reads a template file. Errors name the file only; the error text reaches
/// API responses and must not expose the server's directory layout.
async fn read_file(path: &Path, source_kind: &'static str) -> Result<Vec<u8>, MemeError> {
    tokio::fs::read(path).await.map_err(|e| {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or(std::borrow::Cow::Borrowed("template"));
        MemeError::ImageLoad {
            source_kind,
            reason: format!("{name}: {e}"),
        }
    })
}
