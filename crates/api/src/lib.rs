//! Axum-based HTTP gateway for KeyReg.
//!
//! This crate provides:
//! - `POST /register` (alias `/registerUser`) - Register a user's RSA public key
//! - `GET /user/:userId` (alias `/getUser/:userId`) - Fetch a user's key as `{n, e}`
//! - `POST /updateUser` - Replace a registered user's key
//! - `DELETE /deleteUser/:userId` - Remove a user's key
//! - `GET /health` - Liveness probe
//!
//! Keys are stored on-chain as PKCS#1 DER through a [`keyreg_registry::KeyRegistry`].

#![warn(missing_docs)]

pub mod config;
/// Gateway router and server runtime.
pub mod server;

pub use server::{router, run_with_config};
