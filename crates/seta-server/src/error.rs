//! Error types for the server binary.
//!
//! [`ServerBinError`] wraps every failure mode of startup and serving so
//! `main` can propagate with `?`.

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum ServerBinError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: seta_core::ConfigError,
    },

    /// The log filter directive could not be parsed.
    #[error("invalid log level {level:?}: {message}")]
    Logging {
        /// The configured directive.
        level: String,
        /// Parser message.
        message: String,
    },

    /// The HTTP server failed to bind or crashed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: seta_observer::ServerError,
    },
}
