//! Error types for the ProofRegistry reader

use thiserror::Error;

/// Errors surfaced by the reader and its collaborators.
///
/// Variants are `Clone` because results are fanned out to every waiter of a
/// deduplicated in-flight fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// No ProofRegistry contract address configured
    #[error("ProofRegistry not configured")]
    NotConfigured,

    /// Missing or malformed required input
    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// A network call exceeded its configured timeout
    #[error("timeout during {0}")]
    Timeout(String),

    /// Underlying RPC or contract-call failure, message passed through
    #[error("rpc failure: {0}")]
    Rpc(String),

    /// A textual type hash with the wrong byte width
    #[error("malformed type hash: expected 32 bytes, got {0}")]
    MalformedHash(usize),

    /// Proof definitions file could not be read or parsed
    #[error("definitions error: {0}")]
    Definitions(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    /// Build a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error is a transient transport failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReaderError::Rpc(_) | ReaderError::Timeout(_))
    }
}

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;
