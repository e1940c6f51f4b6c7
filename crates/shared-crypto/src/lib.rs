//! # Shared Crypto
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Claim signing and verification |
//! | `address` | SHA-256 | Account address derivation |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - **Addresses**: first 20 bytes of `sha256(pubkey)`, stable across formats

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod errors;
pub mod signatures;

// Re-exports
pub use address::derive_address;
pub use errors::CryptoError;
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
