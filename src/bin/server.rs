//! Recipe Catalog Server
//!
//! Serves the catalog over a JSON HTTP API.
//!
//! # Configuration
//!
//! Settings are read from the config file and environment, environment
//! taking precedence:
//! - `RECIPES_CONFIG`: Path to config file (default: ~/.config/recipes/config.yaml)
//! - `RECIPES_BACKEND`: `memory` or `sqlite` (default: sqlite)
//! - `RECIPES_DATABASE_PATH`: SQLite file (default: ~/.local/share/recipes/recipes.db)
//! - `RECIPES_HOST`: Address to bind (default: 0.0.0.0)
//! - `RECIPES_PORT`: Port to listen on (default: 8080)
//! - `RECIPES_SEED`: Add demo records to an empty catalog (default: false)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check
//! - `/recipes`, `/authors`, `/ingredients`: list (`GET`) and create (`POST`)
//! - `/{collection}/{id}`: fetch (`GET`), edit (`PATCH`) and delete (`DELETE`)
//! - `GET /authors/{id}/recipes`, `GET /ingredients/{id}/recipes`

use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_catalog::{server, Catalog, Config};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_catalog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("RECIPES_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path)?;

    match &config.config_file {
        Some(path) => tracing::info!("Config file: {}", path.display()),
        None => tracing::info!("No config file found, using defaults"),
    }
    tracing::info!(
        "Backend: {} ({})",
        config.backend.value,
        config.backend.source
    );

    let catalog = Catalog::open(&config).await?;

    if config.seed.value && catalog.seed_defaults().await? {
        tracing::info!("Seeded demo records");
    }

    for violation in catalog.integrity_report().await {
        tracing::warn!("Integrity violation: {}", violation);
    }

    let app = server::router(Arc::new(catalog)).layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
