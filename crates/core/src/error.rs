//! Error types for Sage.
//!
//! Every failure the pipeline can report falls into one of four kinds:
//! configuration, backend, data and input. I/O and serialization failures are
//! folded into those kinds when they are surfaced to a caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for Sage.
///
/// All functions in the workspace return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing credential, missing or inconsistent index artifact,
    /// dimension mismatch. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding or generation service unavailable or erroring.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A document or corpus that cannot be turned into chunks.
    #[error("Data error: {0}")]
    Data(String),

    /// Rejected request parameters (empty question, non-positive top_k).
    #[error("Input error: {0}")]
    Input(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The four failure kinds reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Backend,
    Data,
    Input,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Backend => "backend",
            Self::Data => "data",
            Self::Input => "input",
        }
    }
}

/// Structured failure handed to callers: a kind plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    /// Classify this error.
    ///
    /// Filesystem and decoding problems only ever happen while reading or
    /// writing index artifacts and configuration, so they count as
    /// configuration failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) | AppError::Io(_) | AppError::Serialization(_) => {
                ErrorKind::Configuration
            }
            AppError::Backend(_) => ErrorKind::Backend,
            AppError::Data(_) => ErrorKind::Data,
            AppError::Input(_) => ErrorKind::Input,
        }
    }

    /// Convert into the single structured failure reported to callers.
    pub fn to_failure(&self) -> Failure {
        let message = match self {
            AppError::Config(m)
            | AppError::Backend(m)
            | AppError::Data(m)
            | AppError::Input(m)
            | AppError::Serialization(m) => m.clone(),
            AppError::Io(e) => e.to_string(),
        };

        Failure {
            kind: self.kind(),
            message,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
