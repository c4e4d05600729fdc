//! RoastBot Serve - HTTP service that renders roast and compliment memes.
//!
//! Accepts a caption plus an optional inline image or template reference
//! and returns a PNG meme as a data URL. Also fronts an OpenAI-compatible
//! API for caption text and keeps lightweight engagement counters.
//!
//! # Architecture
//!
//! - **Load**: inline data URL, template file or default template, with
//!   retry and fallback between sources
//! - **Layout**: canvas sizing, font sizing and greedy word wrap
//! - **Composite**: tiny-skia raster pipeline (blend, vignette, stroked and
//!   shadowed caption, translucent band, watermark)
//! - **Encode**: PNG with retry on transient failures
//! - **Cache**: moka LRU of encoded PNGs keyed by request fingerprint
//!
//! # Endpoints
//!
//! ```text
//! POST /api/generate-meme   render a meme
//! POST /api/generate        generate caption text
//! POST /api/feedback        record a reaction
//! GET|POST /api/track-share share totals / record a share
//! GET  /api/templates       template catalog
//! POST /api/templates       upload a custom template
//! GET  /health              liveness
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod generate;
pub mod render;
pub mod routes;
pub mod state;
pub mod templates;
pub mod upload;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
