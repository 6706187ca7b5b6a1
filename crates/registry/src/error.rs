//! Error types for registry collaborators.

use alloy::primitives::B256;
use thiserror::Error;

/// Registry error type.
///
/// `Display` carries the underlying message unchanged so it can be surfaced
/// to API clients as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Transport, RPC or contract call failure.
    #[error("{0}")]
    Rpc(String),

    /// The transaction was mined but its receipt reports failure.
    #[error("Transaction reverted: 0x{} in block {}", hex::encode(.tx_hash), .block_number.unwrap_or_default())]
    Reverted {
        /// Hash of the reverted transaction.
        tx_hash: B256,
        /// Block the transaction was mined in.
        block_number: Option<u64>,
    },

    /// The registry refused the operation.
    #[error("{0}")]
    Rejected(String),
}

impl RegistryError {
    /// Wrap any displayable error as an RPC failure.
    pub fn rpc<E: std::fmt::Display>(err: E) -> Self {
        Self::Rpc(err.to_string())
    }
}

/// Result type alias for RegistryError.
pub type Result<T> = std::result::Result<T, RegistryError>;
