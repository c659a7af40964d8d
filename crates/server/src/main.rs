//! Singletrack server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use singletrack_core::config::AppConfig;
use singletrack_server::{AppState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Singletrack - a mountain bike trail vector tile server
#[derive(Parser, Debug)]
#[command(name = "singletrackd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SINGLETRACK_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("Singletrack v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    // Check for SINGLETRACK_ environment variables (excluding SINGLETRACK_CONFIG which is just the path)
    let has_env_config = std::env::vars()
        .any(|(key, _)| key.starts_with("SINGLETRACK_") && key != "SINGLETRACK_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: singletrackd --config /path/to/config.toml\n  \
             2. Environment variables: SINGLETRACK_SERVER__BIND=0.0.0.0:8080 \
             SINGLETRACK_STORE__BACKEND=sqlite SINGLETRACK_STORE__PATH=/var/lib/singletrack/trails.db singletrackd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set SINGLETRACK_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("SINGLETRACK_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Fail fast on impossible zoom or extent settings
    config.tiles.validate().context("invalid tile configuration")?;

    // Register Prometheus metrics
    singletrack_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Open the trail store
    let store = singletrack_store::from_config(&config.store)
        .await
        .context("failed to open trail store")?;
    tracing::info!("Trail store initialized");

    // Verify store connectivity before accepting requests so the server
    // never reports healthy with an unreachable database.
    store
        .health_check()
        .await
        .context("store health check failed")?;
    tracing::info!("Trail store connectivity verified");

    let bind = config.server.bind.clone();
    let state = AppState::new(config, store);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(bind = %bind, "Server listening");

    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}
