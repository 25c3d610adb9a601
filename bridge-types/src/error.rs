//! Error types for stepbridge-types.

use thiserror::Error;

/// Errors produced while parsing shared types from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// The string does not name a request kind.
    #[error("unknown request kind: {0}")]
    UnknownKind(String),

    /// The string is not a valid base64 node handle.
    #[error("invalid node handle: {0}")]
    InvalidHandle(String),
}
