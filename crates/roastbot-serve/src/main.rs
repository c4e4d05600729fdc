//! RoastBot Serve - HTTP server for meme rendering and caption generation.

use axum::http::Request;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use roastbot_serve::{AppState, Config, router};

/// RoastBot Serve - roast and compliment meme API.
#[derive(Parser, Debug)]
#[command(name = "roastbot-serve")]
#[command(about = "Meme rendering and caption generation API", long_about = None)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();

    if let Some(port) = config.metrics_port {
        match roastbot_core::metrics::try_init_metrics() {
            Some(handle) => roastbot_core::metrics::start_metrics_server(port, handle).await?,
            None => tracing::warn!("metrics recorder already installed, skipping exporter"),
        }
    }

    let state = AppState::new(config)?;

    let app = router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting roastbot server");

    axum::serve(listener, app).await?;

    Ok(())
}
