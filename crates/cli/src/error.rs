//! Error types for CLI operations.

use contracts::SyncError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Pipeline stage failure
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {0:#}")]
    Logging(anyhow::Error),

    /// Run summary could not be rendered
    #[error("Failed to render run summary: {message}")]
    Summary { message: String },
}

impl CliError {
    pub fn summary(message: impl Into<String>) -> Self {
        Self::Summary {
            message: message.into(),
        }
    }

    /// Process exit code: stage errors map through their taxonomy, the rest is 1
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Sync(err) => err.exit_code(),
            Self::Logging(_) | Self::Summary { .. } => 1,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
