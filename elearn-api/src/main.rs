//! elearn-api - course sequencing and progress service
//!
//! Resolves configuration, opens (or creates) the database and serves the
//! REST API.

use anyhow::Result;
use clap::Parser;
use elearn_common::config::{CliOverrides, ServiceConfig};
use elearn_common::db::init::init_database;
use elearn_api::{build_router, AppState};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments; unset values fall back to ELEARN_* variables,
/// the config file and compiled defaults, in that order
#[derive(Debug, Parser)]
#[command(name = "elearn-api", version, about = "eLearn course sequencing service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            config: args.config,
            database: args.database,
            host: args.host,
            port: args.port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config comes first so its log level can seed the filter; RUST_LOG still wins
    let config = ServiceConfig::resolve(&args.into());
    let level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    info!(
        "Starting eLearn API (elearn-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Database path: {}", config.database_path.display());
    info!(
        "Progress weights: video {} / test {}; reorder strategy {:?}",
        config.progress.video_weight, config.progress.test_weight, config.reorder_strategy
    );

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool, config.progress, config.reorder_strategy);
    let app = build_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("elearn-api listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
