//! # KeyReg Core
//!
//! Types and the RSA public key codec shared by the KeyReg gateway, the
//! registry clients and the operator CLI.
//!
//! ## Features
//!
//! - **Codec**: `{n, e}` JSON keys to PKCS#1 `RSAPublicKey` DER and back
//! - **Types**: [`PublicKeyJson`], [`UserKey`]
//! - **Errors**: [`CodecError`] with encoding and decoding variants

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{decode, encode, encode_json, parse_exponent};
pub use error::{CodecError, Result};
pub use types::*;
