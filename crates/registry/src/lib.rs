//! Registry collaborators for KeyReg.
//!
//! The gateway never talks to the chain directly. It holds an
//! `Arc<dyn KeyRegistry>` built at startup, which is either:
//!
//! - [`ContractRegistry`]: the `PublicKeyRegistry` contract reached through an
//!   alloy HTTP provider with a local signing wallet
//! - [`MemoryRegistry`]: an in-process map with the same accept/reject rules,
//!   used by tests and local development
//!
//! Keys cross this boundary as opaque DER bytes; encoding is the caller's job.

#![warn(missing_docs)]

pub mod contract;
pub mod error;
pub mod memory;

use alloy::primitives::B256;
use async_trait::async_trait;

pub use contract::ContractRegistry;
pub use error::{RegistryError, Result};
pub use memory::MemoryRegistry;

/// Receipt of a mutating registry call that was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Hash of the transaction that applied the change.
    pub tx_hash: B256,
    /// Block the transaction was included in, when known.
    pub block_number: Option<u64>,
}

impl Confirmation {
    /// Transaction hash as `0x`-prefixed hex.
    pub fn tx_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.tx_hash))
    }
}

/// The userId → public key store the gateway delegates to.
///
/// Mutations resolve only once the change is confirmed. Implementations must
/// not retry.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Whether `user_id` currently has a key.
    async fn is_user_registered(&self, user_id: &str) -> Result<bool>;

    /// DER-encoded key registered for `user_id`.
    async fn get_public_key(&self, user_id: &str) -> Result<Vec<u8>>;

    /// Register a key for a new user.
    async fn set_public_key(&self, user_id: &str, der: &[u8]) -> Result<Confirmation>;

    /// Replace the key of an existing user.
    async fn update_public_key(&self, user_id: &str, der: &[u8]) -> Result<Confirmation>;

    /// Remove a user's key.
    async fn delete_public_key(&self, user_id: &str) -> Result<Confirmation>;
}
