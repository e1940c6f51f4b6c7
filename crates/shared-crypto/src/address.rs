//! # Account Addresses
//!
//! An account address is the first 20 bytes of the SHA-256 digest of the
//! account's Ed25519 public key.

use sha2::{Digest, Sha256};
use shared_types::{AccAddress, PubKey};

/// Derive the on-ledger address for a public key.
pub fn derive_address(pubkey: &PubKey) -> AccAddress {
    let digest = Sha256::digest(pubkey.as_bytes());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[..20]);
    AccAddress(out)
}
