//! Error types for the wallet command layer

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wallet and restart commands
#[derive(Error, Debug)]
pub enum Error {
    // Credential errors
    #[error(
        "Password required, please use '-p <password>' to specify the password.\n\
         Try 'btfs wallet password --help' and assign a password if password is not set."
    )]
    MissingPassword,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("{0}")]
    AlreadyInitialized(String),

    // Amount errors
    #[error("invalid amount '{0}': expected an integer number of µBTT")]
    InvalidAmount(String),

    /// Canonical user-facing text for an amount below the delegate's minimum
    #[error("{0}")]
    ThresholdViolation(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config I/O error: {0}")]
    ConfigIo(String),

    // Wallet service errors (passed through unmodified)
    #[error("{0}")]
    Service(String),

    #[error("Wallet service unreachable: {0}")]
    ServiceUnavailable(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    // Restart errors
    #[error("Failed to stop the running daemon: {0}")]
    ShutdownFailure(String),

    #[error("Storage relocation failed: {0}")]
    RelocationFailure(String),

    #[error("Failed to start daemon process: {0}")]
    ProcessSpawnFailure(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ServiceUnavailable(_))
    }

    /// Failures inside the restart sequence, after which no daemon may be running
    pub fn is_restart_failure(&self) -> bool {
        matches!(
            self,
            Error::ShutdownFailure(_) | Error::RelocationFailure(_) | Error::ProcessSpawnFailure(_)
        )
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

// Conversion from HTTP client errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Error::ServiceUnavailable(e.to_string())
        } else {
            Error::Service(e.to_string())
        }
    }
}
