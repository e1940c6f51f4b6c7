//! # Outbound Ports (Driven Side)
//!
//! Collaborators the engine is constructed with. No ambient globals: every
//! dependency is passed in.
//!
//! | Port | Purpose |
//! |------|---------|
//! | `KvStore` | Ordered byte key/value engine behind the typed tables |
//! | `BalanceLedger` | Pool and account balances, transfers, mint/burn |
//! | `ValidatorRegistry` | Bonded validators, stake shares, delegations |
//! | `KeyVerifier` | Signature verification for usage claims |

use shared_types::{Coin, Holder, PubKey};

use crate::domain::entities::{ValidatorInfo, VoteInfo};
use crate::domain::errors::{LedgerError, RegistryError, StoreError};

// =============================================================================
// KEY/VALUE STORE
// =============================================================================

/// A single write in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Ordered byte key/value storage.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Apply a batch of writes. Backends with native batches apply it
    /// atomically.
    fn write_batch(&mut self, batch: Vec<KvOp>) -> Result<(), StoreError> {
        for op in batch {
            match op {
                KvOp::Set { key, value } => self.set(&key, value)?,
                KvOp::Delete { key } => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl<K: KvStore + ?Sized> KvStore for Box<K> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        (**self).scan_prefix(prefix)
    }

    fn write_batch(&mut self, batch: Vec<KvOp>) -> Result<(), StoreError> {
        (**self).write_batch(batch)
    }
}

// =============================================================================
// BALANCE LEDGER
// =============================================================================

/// A ledger mutation, recorded by scratch contexts and replayed on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Transfer { from: Holder, to: Holder, coin: Coin },
    Mint { to: Holder, coin: Coin },
    Burn { from: Holder, coin: Coin },
}

/// Token balances of module pools and accounts.
pub trait BalanceLedger {
    fn balance(&self, holder: &Holder, denom: &str) -> Result<u128, LedgerError>;

    /// Total supply of a denomination.
    fn supply(&self, denom: &str) -> Result<u128, LedgerError>;

    /// Denominations the holder has a non-zero balance of, sorted.
    fn denoms(&self, holder: &Holder) -> Result<Vec<String>, LedgerError>;

    /// Move `coin` between holders. Fails with `InsufficientFunds` without
    /// side effects when the source is short.
    fn transfer(&mut self, from: &Holder, to: &Holder, coin: &Coin) -> Result<(), LedgerError>;

    fn mint(&mut self, to: &Holder, coin: &Coin) -> Result<(), LedgerError>;

    fn burn(&mut self, from: &Holder, coin: &Coin) -> Result<(), LedgerError>;

    /// Replay recorded mutations in order.
    fn apply(&mut self, ops: Vec<LedgerOp>) -> Result<(), LedgerError> {
        for op in ops {
            match op {
                LedgerOp::Transfer { from, to, coin } => self.transfer(&from, &to, &coin)?,
                LedgerOp::Mint { to, coin } => self.mint(&to, &coin)?,
                LedgerOp::Burn { from, coin } => self.burn(&from, &coin)?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// VALIDATOR REGISTRY
// =============================================================================

/// Read-only view of the staking set.
pub trait ValidatorRegistry {
    /// Bonded validators that signed the previous block, with their
    /// delegations.
    fn bonded_signing_validators(
        &self,
        votes: &[VoteInfo],
    ) -> Result<Vec<ValidatorInfo>, RegistryError>;

    /// Every bonded validator, in power order.
    fn bonded_validators(&self) -> Result<Vec<ValidatorInfo>, RegistryError>;
}

// =============================================================================
// KEY VERIFIER
// =============================================================================

/// Signature verification for claims.
pub trait KeyVerifier {
    fn verify(&self, pubkey: &PubKey, message: &[u8], signature: &[u8]) -> bool;
}
