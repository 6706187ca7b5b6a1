//! In-memory registry.
//!
//! Mirrors the contract's rules: registering an existing id, or updating,
//! reading or deleting a missing one, is rejected the way the contract's
//! `require` checks would revert. Every mutation gets a sequential synthetic
//! transaction hash and block number.
//!
//! Call counters and failure injection make it usable as a test double.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::B256;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{RegistryError, Result};
use crate::{Confirmation, KeyRegistry};

const ALREADY_REGISTERED: &str = "user already registered";
const NOT_REGISTERED: &str = "user not registered";

#[derive(Default)]
struct Inner {
    keys: RwLock<HashMap<String, Vec<u8>>>,
    failure: RwLock<Option<String>>,
    block: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
}

/// [`KeyRegistry`] held in process memory.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Inner>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `message` until
    /// [`clear_failure`](Self::clear_failure) is called.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.inner.failure.write().await = Some(message.into());
    }

    /// Stop injecting failures.
    pub async fn clear_failure(&self) {
        *self.inner.failure.write().await = None;
    }

    /// Store raw bytes for `user_id`, bypassing all checks.
    pub async fn insert_raw(&self, user_id: impl Into<String>, bytes: Vec<u8>) {
        self.inner.keys.write().await.insert(user_id.into(), bytes);
    }

    /// Raw bytes stored for `user_id`, if any.
    pub async fn get_raw(&self, user_id: &str) -> Option<Vec<u8>> {
        self.inner.keys.read().await.get(user_id).cloned()
    }

    /// Number of registered users.
    pub async fn len(&self) -> usize {
        self.inner.keys.read().await.len()
    }

    /// Whether no user is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of read calls (`is_user_registered`, `get_public_key`) made so far.
    pub fn read_count(&self) -> u64 {
        self.inner.reads.load(Ordering::SeqCst)
    }

    /// Number of mutating calls made so far, including rejected ones.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    async fn check_failure(&self) -> Result<()> {
        match self.inner.failure.read().await.as_ref() {
            Some(message) => Err(RegistryError::Rpc(message.clone())),
            None => Ok(()),
        }
    }

    async fn begin_read(&self) -> Result<()> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await
    }

    async fn begin_write(&self) -> Result<()> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await
    }

    fn next_confirmation(&self) -> Confirmation {
        let block = self.inner.block.fetch_add(1, Ordering::SeqCst) + 1;
        Confirmation {
            tx_hash: B256::left_padding_from(&block.to_be_bytes()),
            block_number: Some(block),
        }
    }
}

#[async_trait]
impl KeyRegistry for MemoryRegistry {
    async fn is_user_registered(&self, user_id: &str) -> Result<bool> {
        self.begin_read().await?;
        Ok(self.inner.keys.read().await.contains_key(user_id))
    }

    async fn get_public_key(&self, user_id: &str) -> Result<Vec<u8>> {
        self.begin_read().await?;
        self.inner
            .keys
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| RegistryError::Rejected(NOT_REGISTERED.to_string()))
    }

    async fn set_public_key(&self, user_id: &str, der: &[u8]) -> Result<Confirmation> {
        self.begin_write().await?;
        let mut keys = self.inner.keys.write().await;
        if keys.contains_key(user_id) {
            return Err(RegistryError::Rejected(ALREADY_REGISTERED.to_string()));
        }
        keys.insert(user_id.to_string(), der.to_vec());
        Ok(self.next_confirmation())
    }

    async fn update_public_key(&self, user_id: &str, der: &[u8]) -> Result<Confirmation> {
        self.begin_write().await?;
        let mut keys = self.inner.keys.write().await;
        match keys.get_mut(user_id) {
            Some(stored) => {
                *stored = der.to_vec();
                Ok(self.next_confirmation())
            }
            None => Err(RegistryError::Rejected(NOT_REGISTERED.to_string())),
        }
    }

    async fn delete_public_key(&self, user_id: &str) -> Result<Confirmation> {
        self.begin_write().await?;
        match self.inner.keys.write().await.remove(user_id) {
            Some(_) => Ok(self.next_confirmation()),
            None => Err(RegistryError::Rejected(NOT_REGISTERED.to_string())),
        }
    }
}
