//! Server binary for the SETA shot telemetry service.
//!
//! Wires configuration, logging, the shot store, and the HTTP/`WebSocket`
//! API together and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$SETA_CONFIG` (default `seta-config.yaml`),
//!    falling back to built-in defaults when the file does not exist
//! 2. Initialize structured logging (tracing)
//! 3. Open the shot store and build the shared application state
//! 4. Serve until `Ctrl-C`, then drain in-flight requests and exit

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use seta_core::SetaConfig;
use seta_core::config::{LogFormat, LoggingConfig};
use seta_observer::{AppState, ServerConfig};
use seta_store::ShotStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerBinError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "seta-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot bind.
#[tokio::main]
async fn main() -> Result<(), ServerBinError> {
    // 1. Load configuration. Logging is not up yet, so remember where the
    //    config came from and report it afterwards.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("seta-server starting");
    let source = source.map_or_else(
        || String::from("built-in defaults"),
        |path| path.display().to_string(),
    );
    info!(%source, "Configuration loaded");
    info!(
        host = %config.server.host,
        port = config.server.port,
        data_dir = %config.storage.data_dir.display(),
        fsync = config.storage.fsync,
        channel_capacity = config.live.channel_capacity,
        "Effective configuration"
    );

    // 3. Open storage and build shared state.
    let store = ShotStore::new(&config.storage.data_dir, config.storage.fsync);
    let state = Arc::new(AppState::new(store, config.live.channel_capacity));

    // 4. Serve until Ctrl-C.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    seta_observer::start_server(&server_config, state, shutdown_signal()).await?;

    info!("seta-server stopped");
    Ok(())
}

/// Load configuration from `$SETA_CONFIG` or [`DEFAULT_CONFIG_PATH`].
///
/// Returns the path actually read, or `None` when defaults were used.
fn load_config() -> Result<(SetaConfig, Option<PathBuf>), ServerBinError> {
    let path = std::env::var_os("SETA_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = SetaConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((SetaConfig::from_env()?, None))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), ServerBinError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level).map_err(|e| ServerBinError::Logging {
            level: logging.level.clone(),
            message: e.to_string(),
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

/// Resolve on `Ctrl-C`. If the handler cannot be installed the server
/// keeps running until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
