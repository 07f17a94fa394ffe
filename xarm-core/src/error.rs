//! Error types for XA transaction processing.

use thiserror::Error;

/// The main error type for XA transaction operations.
#[derive(Debug, Error)]
pub enum XarmError {
    /// The caller violated the XA call sequence (double start, end without
    /// start, missing Xid or context). Carries the `XAER_*` error code.
    #[error("XA protocol error ({code}): {message}")]
    Protocol {
        /// The `XAER_*` code describing the violation.
        code: i32,
        /// Human-readable description of the violation.
        message: String,
    },

    /// A two-phase-commit hook failed, or the resource manager was used
    /// before being started.
    #[error("resource manager error: {0}")]
    ResourceManager(String),

    /// An operation was attempted without a backing transaction manager or
    /// active transaction where one is structurally required.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// An operation on an existing transaction failed. Unlike
    /// [`XarmError::IllegalState`], a transaction did exist; this is a
    /// recoverable condition rather than a programming error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Querying the status of an existing transaction failed.
    #[error("transaction status error: {0}")]
    Status(String),
}

impl XarmError {
    /// Creates a protocol error with the given `XAER_*` code.
    pub fn protocol(code: i32, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Returns the `XAER_*` code if this is a protocol error.
    pub fn xa_code(&self) -> Option<i32> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A specialized `Result` type for XA transaction operations.
pub type Result<T> = std::result::Result<T, XarmError>;
