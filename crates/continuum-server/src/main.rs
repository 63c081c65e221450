//! Continuum server binary.
//!
//! Wires the turn engine to its store and to the HTTP surface, then serves
//! until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `continuum-config.yaml` (or `CONTINUUM_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate turn timings
//! 4. Open the state store and rehydrate the room
//! 5. Spawn the background reconciler (unless disabled)
//! 6. Serve the writer API until Ctrl-C
//! 7. Stop the reconciler and exit

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use continuum_api::{AppState, ServerConfig};
use continuum_core::clock::SystemClock;
use continuum_core::config::{ContinuumConfig, LoggingConfig};
use continuum_core::runner;
use continuum_core::{JsonFileStore, MemoryStore, StateStore, TurnEngine};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "continuum-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, rehydration, or the HTTP server
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("continuum-server starting");
    match &source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Validate turn timings.
    let timings = config.turn.timings().map_err(StartupError::from)?;
    info!(
        turn_seconds = config.turn.turn_seconds,
        cooldown_seconds = config.turn.cooldown_seconds,
        max_draft_chars = config.turn.max_draft_chars,
        max_entry_chars = config.turn.max_entry_chars,
        "Turn timings configured"
    );

    // 4. Open the store and rehydrate.
    let store: Arc<dyn StateStore> = if config.storage.in_memory {
        warn!("In-memory storage, nothing survives a restart");
        Arc::new(MemoryStore::new())
    } else {
        info!(path = %config.storage.state_path, "Using JSON state file");
        Arc::new(JsonFileStore::new(&config.storage.state_path))
    };
    let engine = Arc::new(
        TurnEngine::open(
            timings,
            Arc::new(SystemClock),
            store,
            config.turn.status_queue_limit,
        )
        .map_err(StartupError::from)?,
    );

    // 5. Background reconciler.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = if config.turn.reconcile_interval_ms > 0 {
        let period = Duration::from_millis(config.turn.reconcile_interval_ms);
        Some(tokio::spawn(runner::run_reconciler(
            Arc::clone(&engine),
            period,
            shutdown_rx,
        )))
    } else {
        info!("Background reconciler disabled");
        None
    };

    // 6. Serve until Ctrl-C.
    let server_config = ServerConfig {
        host: config.http.host,
        port: config.http.port,
    };
    let app_state = Arc::new(AppState::new(engine, config.feed));
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
        shutdown_tx.send_replace(true);
    };
    continuum_api::start_server(&server_config, app_state, shutdown)
        .await
        .map_err(StartupError::from)?;

    // 7. Stop the reconciler.
    if let Some(handle) = reconciler {
        handle
            .await
            .unwrap_or_else(|e| warn!(error = %e, "Reconciler task ended abnormally"));
    }

    info!("continuum-server shutdown complete");
    Ok(())
}

/// Load configuration from `CONTINUUM_CONFIG` or `continuum-config.yaml`.
///
/// A missing file yields the defaults (with environment overrides applied).
/// Returns the path that was read, if any.
fn load_config() -> Result<(ContinuumConfig, Option<PathBuf>), StartupError> {
    let path = std::env::var_os("CONTINUUM_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = ContinuumConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = ContinuumConfig::default();
        config.apply_env_overrides();
        Ok((config, None))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
