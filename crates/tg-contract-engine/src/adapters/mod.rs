//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! | Adapter | Port |
//! |---------|------|
//! | `InMemoryKvStore` | `KvStore` |
//! | `RocksKvStore` (feature `rocksdb`) | `KvStore` |
//! | `InMemoryLedger` | `BalanceLedger` |
//! | `StaticValidatorRegistry` | `ValidatorRegistry` |
//! | `Ed25519Verifier` | `KeyVerifier` |

pub mod ed25519_verifier;
pub mod memory_kv;
pub mod memory_ledger;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_kv;
pub mod validator_registry;

pub use ed25519_verifier::Ed25519Verifier;
pub use memory_kv::InMemoryKvStore;
pub use memory_ledger::InMemoryLedger;
#[cfg(feature = "rocksdb")]
pub use rocksdb_kv::{RocksKvConfig, RocksKvStore};
pub use validator_registry::StaticValidatorRegistry;
