//! Top-level error types for Nebulabot.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config key: {0}")]
    MissingKey(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Terminal outcomes of a backend pool attempt.
///
/// `Fatal` carries the failing target's status and message verbatim;
/// `Exhausted` carries the last retryable error seen before the pool ran dry.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("{status}: {message}")]
    Fatal { status: u16, message: String },

    #[error("all backends exhausted; last error: {last}")]
    Exhausted { last: String },
}

/// Errors from individual backend clients.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("{status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Wrap a reqwest transport failure.
    pub fn transport(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}
