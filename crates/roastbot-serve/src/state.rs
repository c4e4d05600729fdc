//! Application state shared across all request handlers.

use std::sync::Arc;

use roastbot_core::{AnalyticsStore, InMemoryAnalytics};

use crate::cache::MemeCache;
use crate::config::Config;
use crate::generate::{OpenAiGenerator, TextGenerator};
use crate::render::{FontFace, ImageLoader, MemeRenderer};
use crate::templates::TemplateStore;

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Template directory, for uploads.
    pub templates: TemplateStore,

    /// Meme rendering pipeline.
    pub renderer: Arc<MemeRenderer>,

    /// Rendered PNGs keyed by request fingerprint.
    pub cache: MemeCache,

    /// Reaction and share counters.
    pub analytics: Arc<dyn AnalyticsStore>,

    /// Text generator; `None` when no API key is configured.
    pub generator: Option<Arc<dyn TextGenerator>>,
}

impl AppState {
    /// Create application state from configuration with in-memory analytics.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let templates = TemplateStore::new(config.templates_dir.clone(), config.remote_templates);
        let loader = ImageLoader::new(templates, config.retry)?;
        let font = FontFace::load(config.font_path.as_deref(), &config.font_family)?;
        let renderer = MemeRenderer::new(loader, font, &config.watermark, config.retry);

        let generator = match &config.openai {
            Some(openai) => Some(Arc::new(OpenAiGenerator::new(openai.clone(), config.retry)?)
                as Arc<dyn TextGenerator>),
            None => {
                tracing::warn!("OPENAI_API_KEY not set, /api/generate is disabled");
                None
            }
        };

        let analytics: Arc<dyn AnalyticsStore> =
            Arc::new(InMemoryAnalytics::new(config.viral_threshold));

        Ok(Self::with_parts(config, renderer, analytics, generator))
    }

    /// Assemble state from prebuilt collaborators.
    pub fn with_parts(
        config: Config,
        renderer: MemeRenderer,
        analytics: Arc<dyn AnalyticsStore>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let cache = MemeCache::new(config.cache_capacity, config.cache_ttl);
        let templates = TemplateStore::new(config.templates_dir.clone(), config.remote_templates);

        tracing::info!(
            cache_capacity = config.cache_capacity,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            text_generation = generator.is_some(),
            "application state initialized"
        );

        Self {
            config: Arc::new(config),
            templates,
            renderer: Arc::new(renderer),
            cache,
            analytics,
            generator,
        }
    }
}
