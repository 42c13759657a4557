//! Error types for TaskBridge
//!
//! Infrastructure errors live here. Task outcomes (not found, still running,
//! failed, timed out) are modeled as plain enums in `taskbridge-task` and never
//! travel through this type.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// TaskBridge error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Registry invariants
    // ========================================================================
    #[error("Task handle space exhausted")]
    HandlesExhausted,

    #[error("Task handle {0} is already registered")]
    DuplicateHandle(u64),

    #[error("Task {0} was already completed")]
    AlreadyCompleted(u64),

    // ========================================================================
    // Runtime
    // ========================================================================
    #[error("Runtime error: {0}")]
    Runtime(String),

    // ========================================================================
    // External error conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error means a registry invariant was broken.
    ///
    /// These never happen under correct dispatcher use; callers log them
    /// loudly instead of surfacing them to the foreign host.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::DuplicateHandle(_) | Error::AlreadyCompleted(_) | Error::HandlesExhausted
        )
    }
}
