//! RSA public key codec.
//!
//! Converts between the JSON form of an RSA public key (`{n, e}`, modulus as a
//! decimal string) and its PKCS#1 DER encoding, which is what the on-chain
//! registry stores:
//!
//! ```text
//! RSAPublicKey ::= SEQUENCE {
//!     modulus           INTEGER,  -- n
//!     publicExponent    INTEGER   -- e
//! }
//! ```
//!
//! All functions are pure.

use num_bigint::BigUint;
use pkcs1::der::{asn1::UintRef, Decode, Encode};
use pkcs1::RsaPublicKey;
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::types::PublicKeyJson;

/// Encode a modulus (base-10 string) and exponent as PKCS#1 DER.
///
/// # Errors
/// Returns [`CodecError::Encoding`] if `modulus` is not a non-empty string of
/// ASCII digits.
///
/// # Example
/// ```
/// let der = keyreg_core::encode("3233", 17).unwrap();
/// assert_eq!(der, [0x30, 0x07, 0x02, 0x02, 0x0c, 0xa1, 0x02, 0x01, 0x11]);
/// ```
pub fn encode(modulus: &str, exponent: u64) -> Result<Vec<u8>> {
    let modulus = parse_modulus(modulus)?;
    let n_bytes = modulus.to_bytes_be();
    let e_bytes = exponent.to_be_bytes();

    let key = RsaPublicKey {
        modulus: UintRef::new(strip_leading_zeros(&n_bytes))
            .map_err(|e| CodecError::encoding(format!("modulus: {}", e)))?,
        public_exponent: UintRef::new(strip_leading_zeros(&e_bytes))
            .map_err(|e| CodecError::encoding(format!("exponent: {}", e)))?,
    };

    key.to_der()
        .map_err(|e| CodecError::encoding(format!("DER serialization failed: {}", e)))
}

/// Encode a [`PublicKeyJson`] as PKCS#1 DER.
pub fn encode_json(key: &PublicKeyJson) -> Result<Vec<u8>> {
    encode(&key.n, key.e)
}

/// Decode PKCS#1 DER bytes into the JSON key form.
///
/// Trailing bytes, negative or non-canonical integers, missing fields and
/// exponents wider than 64 bits are all rejected with
/// [`CodecError::Decoding`].
pub fn decode(der: &[u8]) -> Result<PublicKeyJson> {
    let key = RsaPublicKey::from_der(der)
        .map_err(|e| CodecError::decoding(format!("invalid RSAPublicKey DER: {}", e)))?;

    let n = BigUint::from_bytes_be(key.modulus.as_bytes());

    let e_bytes = strip_leading_zeros(key.public_exponent.as_bytes());
    if e_bytes.len() > 8 {
        return Err(CodecError::decoding(format!(
            "public exponent is {} bytes wide (max 8)",
            e_bytes.len()
        )));
    }
    let e = e_bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

    Ok(PublicKeyJson {
        n: n.to_str_radix(10),
        e,
    })
}

/// Interpret the JSON `e` field of a request.
///
/// Accepts a non-negative integer number or a string of decimal digits.
pub fn parse_exponent(raw: &Value) -> Result<u64> {
    match raw {
        Value::Number(num) => num.as_u64().ok_or_else(|| {
            CodecError::encoding(format!(
                "exponent must be a non-negative integer (got {})",
                num
            ))
        }),
        Value::String(s) => {
            if !is_decimal(s) {
                return Err(CodecError::encoding(format!(
                    "exponent must be a base-10 integer (got {:?})",
                    s
                )));
            }
            s.parse::<u64>()
                .map_err(|e| CodecError::encoding(format!("exponent out of range: {}", e)))
        }
        other => Err(CodecError::encoding(format!(
            "exponent must be an integer (got {})",
            other
        ))),
    }
}

fn parse_modulus(raw: &str) -> Result<BigUint> {
    if !is_decimal(raw) {
        return Err(CodecError::encoding(format!(
            "modulus must be a base-10 integer (got {:?})",
            raw
        )));
    }
    BigUint::parse_bytes(raw.as_bytes(), 10)
        .ok_or_else(|| CodecError::encoding(format!("modulus is not a valid integer: {}", raw)))
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Drop leading zero bytes, keeping at least one byte.
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    &bytes[first..]
}
