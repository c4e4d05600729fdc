//! Prometheus metrics helpers for RoastBot.
//!
//! # Usage
//!
//! ```rust,ignore
//! use roastbot_core::metrics::{try_init_metrics, start_metrics_server};
//!
//! if let Some(handle) = try_init_metrics() {
//!     start_metrics_server(9091, handle).await?;
//! }
//!
//! metrics::counter!("meme_renders_total").increment(1);
//! ```
//!
//! Recording a metric before a recorder is installed is a no-op, so library
//! code records unconditionally and only the binary decides whether to export.
//!
//! # Metric Naming Conventions
//!
//! - Prefix: subsystem (`meme_`, `feedback_`, `shares_`, `generation_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - Labels: low-cardinality enums only (`source`, `reaction`, `platform`, `outcome`)

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Install the Prometheus recorder and describe RoastBot's metrics.
///
/// Returns `None` if a recorder is already installed.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_common_metrics();
    Some(handle)
}

/// Serve `/metrics` on the given port from a background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

/// Register descriptions for the metrics recorded across RoastBot.
fn register_common_metrics() {
    // =========================================================================
    // Meme Rendering
    // =========================================================================

    describe_counter!("meme_renders_total", "Memes rendered from scratch");
    describe_counter!("meme_cache_hits_total", "Meme requests served from the result cache");
    describe_counter!(
        "meme_cache_misses_total",
        "Meme requests that required a fresh render"
    );
    describe_histogram!(
        "meme_render_duration_seconds",
        "Time spent loading, laying out, compositing and encoding one meme"
    );
    describe_counter!(
        "meme_image_fallbacks_total",
        "Image sources that failed and fell through to the next source (label: source)"
    );
    describe_counter!(
        "retry_attempts_total",
        "Failed attempts that were retried (label: operation)"
    );

    // =========================================================================
    // Engagement
    // =========================================================================

    describe_counter!("feedback_total", "Reactions received (label: reaction)");
    describe_counter!("shares_total", "Shares tracked (label: platform)");

    // =========================================================================
    // Text Generation
    // =========================================================================

    describe_counter!(
        "generation_requests_total",
        "Text generation calls (label: outcome)"
    );
}

// =============================================================================
// Metric Recording Helpers
// =============================================================================

/// Increment a counter by `count`.
#[inline]
pub fn increment(name: &'static str, count: u64) {
    metrics::counter!(name).increment(count);
}

/// Increment a counter carrying a single label.
#[inline]
pub fn increment_labeled(name: &'static str, label: &'static str, value: &'static str) {
    metrics::counter!(name, label => value).increment(1);
}

/// Record a duration in seconds on a histogram.
#[inline]
pub fn observe_seconds(name: &'static str, seconds: f64) {
    metrics::histogram!(name).record(seconds);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_metrics_init() {
        INIT.call_once(|| {
            let _ = try_init_metrics();
        });
    }

    #[test]
    fn test_try_init_metrics_idempotent() {
        let handle1 = try_init_metrics();
        let handle2 = try_init_metrics();

        // At most one should succeed
        assert!(handle1.is_none() || handle2.is_none());
    }

    #[test]
    fn test_increment_does_not_panic() {
        ensure_metrics_init();
        increment("test_counter", 0);
        increment("test_counter", 1);
        increment_labeled("test_labeled_total", "source", "inline");
    }

    #[test]
    fn test_observe_seconds_does_not_panic() {
        ensure_metrics_init();
        observe_seconds("test_duration_seconds", 0.0);
        observe_seconds("test_duration_seconds", 1.25);
    }

    #[test]
    fn test_register_common_metrics_does_not_panic() {
        ensure_metrics_init();
        register_common_metrics();
        register_common_metrics();
    }
}
