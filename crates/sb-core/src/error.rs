//! # AppError
//!
//! Centralized error handling for the Serene crates.
//! Store failures never carry their detail to the user: the call site logs
//! the underlying error and returns `WriteFailure`.

use thiserror::Error;

/// The primary error type for all sb-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A required field is empty or malformed. Nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// The store rejected the write or could not be reached.
    #[error("we couldn't save your changes, please try again")]
    WriteFailure,

    /// Resource not found (e.g., Post, Comment, Review)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Missing identity or ownership gate refused the action
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The action clashes with one already in progress or an existing record
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure outside a write (e.g., subscription refused)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// A specialized Result type for Serene logic.
pub type Result<T> = std::result::Result<T, AppError>;
