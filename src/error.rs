//! Error types for dashsync
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, unknown record)
//! - 4: Operation failed (network, storage, io, lock)
//!
//! Network, storage and validation errors never reach the caller of a
//! synchronizer read or mutation: they degrade to the next data source or
//! to an empty result.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the dashsync CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for dashsync operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: String, id: String },

    // Operation failures (exit code 4)
    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation(_)
            | Error::RecordNotFound { .. } => exit_codes::USER_ERROR,

            Error::Network(_)
            | Error::Storage(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::RecordNotFound { kind, id } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
            })),
            Error::LockFailed(path) => Some(serde_json::json!({
                "path": path.display().to_string(),
            })),
            Error::InvalidConfig(message)
            | Error::InvalidArgument(message)
            | Error::Validation(message) => Some(serde_json::json!({
                "message": message,
            })),
            _ => None,
        }
    }
}

/// Result type alias for dashsync operations
pub type Result<T> = std::result::Result<T, Error>;
