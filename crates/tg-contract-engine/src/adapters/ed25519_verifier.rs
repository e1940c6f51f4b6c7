//! Ed25519 claim signature verification.

use shared_crypto::{Ed25519PublicKey, Ed25519Signature};
use shared_types::PubKey;

use crate::ports::KeyVerifier;

/// Verifies claims against Ed25519 public keys. Malformed keys or signatures
/// fail verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl KeyVerifier for Ed25519Verifier {
    fn verify(&self, pubkey: &PubKey, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = Ed25519PublicKey::from_pubkey(pubkey) else {
            return false;
        };
        let Ok(signature) = Ed25519Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}
