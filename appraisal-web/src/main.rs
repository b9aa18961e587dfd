//! appraisal-web - Property appraisal check service
//!
//! Startup order: command line, configuration file, tracing, secrets and
//! overrides, build banner, model client, HTTP server with graceful shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use appraisal_common::config::{
    load_toml_config, locate_config_file, ConfigOverrides, ServiceConfig, TomlConfig,
};
use appraisal_web::services::AnthropicClient;
use appraisal_web::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for appraisal-web
#[derive(Parser, Debug)]
#[command(name = "appraisal-web")]
#[command(about = "Property appraisal check service")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "APPRAISAL_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "APPRAISAL_PORT")]
    port: Option<u16>,

    /// Mark the session cookie `Secure` (deploy behind HTTPS)
    #[arg(long, env = "APPRAISAL_PRODUCTION")]
    production: bool,

    /// Configuration file (TOML)
    #[arg(short, long, env = "APPRAISAL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = locate_config_file(args.config.as_deref())
        .context("Failed to locate configuration file")?;
    let toml = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load configuration file")?,
        None => TomlConfig::default(),
    };

    // Before resolving, so secret precedence warnings are visible.
    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let overrides = ConfigOverrides {
        host: args.host,
        port: args.port,
        production: args.production,
    };
    let config = ServiceConfig::resolve(overrides, toml).context("Invalid configuration")?;

    info!(
        "Starting appraisal-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file found, using defaults and environment"),
    }
    if !config.production {
        warn!("Development mode: session cookie is sent without the Secure flag");
    }
    info!(
        model = %config.anthropic.model,
        base_url = %config.anthropic.base_url,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Model and rate limit configured"
    );

    let client =
        AnthropicClient::new(&config.anthropic).context("Failed to build model client")?;

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("Failed to read bound address")?;

    let state = AppState::new(config, Arc::new(client));
    let app = build_router(state);

    info!("appraisal-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
