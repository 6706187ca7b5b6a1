//! Core types for KeyReg.

use serde::{Deserialize, Serialize};

/// RSA public key in its JSON form.
///
/// `n` is the modulus rendered in base 10, `e` the public exponent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeyJson {
    /// Modulus as a canonical decimal string.
    pub n: String,
    /// Public exponent.
    pub e: u64,
}

impl PublicKeyJson {
    /// Create a key from a modulus string and exponent.
    pub fn new(n: impl Into<String>, e: u64) -> Self {
        Self { n: n.into(), e }
    }
}

/// A user's registered key as returned by the fetch endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKey {
    /// Registry user identifier.
    pub user_id: String,
    /// The decoded public key.
    pub public_key: PublicKeyJson,
}
