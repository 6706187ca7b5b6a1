//! Error types for the core crate.

use thiserror::Error;

/// Codec error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The structured key could not be turned into DER.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The bytes are not a DER-encoded RSA public key.
    #[error("Decoding error: {0}")]
    Decoding(String),
}

impl CodecError {
    pub(crate) fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub(crate) fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }
}

/// Result type alias for CodecError.
pub type Result<T> = std::result::Result<T, CodecError>;
