//! Layered error definitions
//!
//! Categorized by stage: input discovery / video decode / schema / arguments,
//! plus the ambient config / csv / image / io failures.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Unified error type
///
/// Every variant aborts the run; nothing is retried.
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Input Errors =====
    /// Required CSV stream or video file is absent or unreadable
    #[error("missing input {what}: {}", path.display())]
    MissingInput { what: String, path: PathBuf },

    // ===== Video Errors =====
    /// Video source cannot be opened for decoding
    #[error("cannot open video source {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// Decoder failed after the source was opened
    #[error("video decode error: {message}")]
    Decode { message: String },

    // ===== Table Errors =====
    /// Merge key column absent, non-numeric or non-finite
    #[error("schema error in table '{table}', column '{column}': {message}")]
    Schema {
        table: String,
        column: String,
        message: String,
    },

    /// CSV read/write failure
    #[error("csv error in {}: {message}", path.display())]
    Csv { path: PathBuf, message: String },

    // ===== Output Errors =====
    /// JPEG encoding failure
    #[error("failed to write image {}: {message}", path.display())]
    Image { path: PathBuf, message: String },

    // ===== Invocation Errors =====
    /// Wrong command-line arity or malformed argument
    #[error("invalid arguments: {message}")]
    Argument { message: String },

    /// Configuration parse error
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error with the operation that failed
    #[error("io error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Create missing input error
    pub fn missing_input(what: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::MissingInput {
            what: what.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create video open error
    pub fn open(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create schema error
    pub fn schema(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Schema {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create csv error
    pub fn csv(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Csv {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create image error
    pub fn image(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Image {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create argument error
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create io error
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code reported by the CLI for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Argument { .. } => 1,
            Self::MissingInput { .. } => 3,
            Self::Open { .. } => 4,
            Self::Schema { .. } => 5,
            Self::Config { .. } | Self::ConfigValidation { .. } => 6,
            _ => 1,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SyncError>;
