//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use roastbot_core::RetryPolicy;
use roastbot_core::analytics::DEFAULT_VIRAL_THRESHOLD;

/// Default template directory, shipped with the crate.
pub const DEFAULT_TEMPLATES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/templates");

/// Family name of the embedded fallback font.
pub const DEFAULT_FONT_FAMILY: &str = "DejaVu Sans";

/// Watermark drawn in the bottom-right corner of every meme.
pub const DEFAULT_WATERMARK: &str = "RoastBot.app";

/// Credentials and endpoint for the text-generation API.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Directory holding the default and catalog template images.
    pub templates_dir: PathBuf,

    /// Optional TTF/OTF file replacing the embedded font.
    pub font_path: Option<PathBuf>,

    /// Family name reported for the loaded font.
    pub font_family: String,

    /// Watermark label.
    pub watermark: String,

    /// Maximum number of rendered memes kept in memory.
    pub cache_capacity: u64,

    /// Lifetime of a cached render.
    pub cache_ttl: Duration,

    /// Backoff policy for image loads, PNG encoding and API calls.
    pub retry: RetryPolicy,

    /// Allow `http(s)://` template references.
    pub remote_templates: bool,

    /// Share total at which content is reported as viral.
    pub viral_threshold: u64,

    /// Port for the Prometheus `/metrics` listener, if enabled.
    pub metrics_port: Option<u16>,

    /// Text-generation API settings; `None` disables `/api/generate`.
    pub openai: Option<OpenAiConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            font_path: None,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            watermark: DEFAULT_WATERMARK.to_string(),
            cache_capacity: 100,
            cache_ttl: Duration::from_secs(3600),
            retry: RetryPolicy::default(),
            remote_templates: false,
            viral_threshold: DEFAULT_VIRAL_THRESHOLD,
            metrics_port: None,
            openai: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - None (all have defaults for local development)
    ///
    /// Optional:
    /// - `ROASTBOT_BIND_ADDR`: Server bind address (default: "0.0.0.0:3000")
    /// - `ROASTBOT_TEMPLATES_DIR`: Template image directory (default: bundled assets)
    /// - `ROASTBOT_FONT_PATH`: Font file replacing the embedded DejaVu Sans Bold
    /// - `ROASTBOT_FONT_FAMILY`: Family name of that font (default: "DejaVu Sans")
    /// - `ROASTBOT_WATERMARK`: Watermark label (default: "RoastBot.app")
    /// - `ROASTBOT_CACHE_CAPACITY` / `ROASTBOT_CACHE_TTL_SECS`: Result cache bounds (100 / 3600)
    /// - `ROASTBOT_RETRY_ATTEMPTS` / `ROASTBOT_RETRY_BASE_DELAY_MS` / `ROASTBOT_RETRY_MULTIPLIER`:
    ///   Backoff policy (3 / 1000 / 1.5)
    /// - `ROASTBOT_REMOTE_TEMPLATES`: Allow URL templates (default: false)
    /// - `ROASTBOT_VIRAL_THRESHOLD`: Share count considered viral (default: 100)
    /// - `ROASTBOT_METRICS_PORT`: Serve Prometheus metrics on this port
    /// - `OPENAI_API_KEY` / `OPENAI_BASE_URL` / `OPENAI_MODEL`: Text generation
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("ROASTBOT_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let templates_dir = std::env::var("ROASTBOT_TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.templates_dir);

        let font_path = std::env::var("ROASTBOT_FONT_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let font_family = std::env::var("ROASTBOT_FONT_FAMILY").unwrap_or(defaults.font_family);

        let watermark = std::env::var("ROASTBOT_WATERMARK").unwrap_or(defaults.watermark);

        let cache_capacity = parse_var("ROASTBOT_CACHE_CAPACITY")?.unwrap_or(defaults.cache_capacity);
        if cache_capacity == 0 {
            anyhow::bail!("ROASTBOT_CACHE_CAPACITY must be at least 1");
        }

        let cache_ttl = parse_var::<u64>("ROASTBOT_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let retry = RetryPolicy::new(
            parse_var("ROASTBOT_RETRY_ATTEMPTS")?.unwrap_or(defaults.retry.max_attempts),
            parse_var::<u64>("ROASTBOT_RETRY_BASE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            parse_var("ROASTBOT_RETRY_MULTIPLIER")?.unwrap_or(defaults.retry.multiplier),
        );
        if !(retry.multiplier.is_finite() && retry.multiplier >= 1.0) {
            anyhow::bail!("ROASTBOT_RETRY_MULTIPLIER must be a finite number >= 1.0");
        }

        let remote_templates =
            parse_var("ROASTBOT_REMOTE_TEMPLATES")?.unwrap_or(defaults.remote_templates);

        let viral_threshold =
            parse_var("ROASTBOT_VIRAL_THRESHOLD")?.unwrap_or(defaults.viral_threshold);

        let metrics_port = parse_var("ROASTBOT_METRICS_PORT")?;

        let openai = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|api_key| OpenAiConfig {
                api_key,
                base_url: std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            });

        tracing::info!(
            bind_addr = %bind_addr,
            templates_dir = %templates_dir.display(),
            font_path = ?font_path,
            font_family = %font_family,
            cache_capacity,
            cache_ttl_secs = cache_ttl.as_secs(),
            retry_attempts = retry.max_attempts,
            retry_base_delay_ms = retry.base_delay.as_millis() as u64,
            remote_templates,
            metrics_port = ?metrics_port,
            text_generation = openai.is_some(),
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            templates_dir,
            font_path,
            font_family,
            watermark,
            cache_capacity,
            cache_ttl,
            retry,
            remote_templates,
            viral_threshold,
            metrics_port,
            openai,
        })
    }
}

/// Parse an optional environment variable, failing on malformed values.
fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        _ => Ok(None),
    }
}
