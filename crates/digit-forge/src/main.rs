//! # Digit Forge - Mystery Digits image server
//!
//! Generates obfuscated digit images for the game layer and serves them
//! from the artifact directory.
//!
//! ## Architecture
//! ```text
//! Game layer → digit-forge (HTTP) → Forge → artifact dir
//!                     ↓
//!               ServeDir (PNG files)
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use digit_forge::config::AppConfig;
use digit_forge::routes;
use digit_forge::state::AppState;

/// Mystery Digits image forge
#[derive(Parser, Debug)]
#[command(name = "digit-forge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/digit-forge.toml", env = "DIGIT_FORGE_CONFIG")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Artifact directory (overrides config)
    #[arg(long, env = "ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🔢 Starting Digit Forge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = AppConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(dir) = args.artifact_dir {
        config.artifact_dir = dir;
    }
    info!("📋 Configuration loaded from {}", args.config);

    // Initialize application state
    let state = AppState::new(config.clone()).context("Failed to initialize forge")?;
    info!(
        dir = ?config.artifact_dir,
        tiers = state.forge.recipes().len(),
        default_tier = %state.forge.recipes().default_tier(),
        "✅ Forge ready"
    );

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Digit Forge listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("🛑 Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 Digit Forge shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()?;
    }

    Ok(())
}
