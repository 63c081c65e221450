//! Error types for the Continuum server binary.
//!
//! [`StartupError`] wraps every failure that can stop the service from
//! coming up or keep it from serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: continuum_core::config::ConfigError,
    },

    /// The saved room could not be loaded or failed integrity checks.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: continuum_core::EngineError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: continuum_api::ServerError,
    },
}
