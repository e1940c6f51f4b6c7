//! # TollGate Contract Engine
//!
//! Providers bond collateral to sell access to a registered service. Clients open
//! escrowed contracts against them, either as a time-based subscription or as
//! pay-as-you-go billed from signed usage claims. Settlement moves escrow to
//! the provider, minus a reserve tax; the reserve in turn pays validators.
//!
//! ## Block Flow
//!
//! ```text
//! Block ──→ version gate ──→ tx 1..n ──→ expiration sweep ──→ payout ──→ invariants
//!                             │ validate (read-only)                        │
//!                             └ apply (scratch, merged on success)          └ fatal on breach
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Bond existence | A provider record exists iff its bond is positive |
//! | 2 | One active contract | Per (provider, service, spender) |
//! | 3 | Paid never exceeds deposit | Claims clamp to the remaining escrow |
//! | 4 | Idempotent finalization | Settling a settled contract is a no-op |
//! | 5 | Bond solvency | Bond pool covers every recorded bond |
//! | 6 | Escrow solvency | Escrow covers `deposit - paid` of unsettled contracts |
//! | 7 | Supply cap | Native supply never exceeds the configured maximum |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Pure domain logic
//! - `ports/` - Inbound query API, outbound collaborator traits
//! - `store/` - Typed tables, scratch overlays, execution context
//! - `handlers/` - One validate/apply pair per message
//! - `settlement.rs` - Finalization against ledger and tables
//! - `lifecycle.rs` - Begin/end block hooks
//! - `adapters/` - In-memory and RocksDB implementations
//! - `service.rs` - Block execution
//!
//! ## Usage
//!
//! ```ignore
//! use tg_contract_engine::*;
//!
//! let mut engine = ContractEngine::new(
//!     InMemoryKvStore::new(),
//!     InMemoryLedger::new(),
//!     StaticValidatorRegistry::default(),
//!     Ed25519Verifier,
//!     ConfigRegistry::default(),
//! );
//! engine.init_genesis(1, &[ServiceRecord::new(1, Service::new("btc-mainnet")?)])?;
//! let result = engine.execute_block(&block)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod events;
pub mod handlers;
pub mod lifecycle;
pub mod ports;
pub mod query;
pub mod service;
pub mod settlement;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export key types for convenience
pub use adapters::{Ed25519Verifier, InMemoryKvStore, InMemoryLedger, StaticValidatorRegistry};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksKvConfig, RocksKvStore};
pub use domain::config::{ConfigRegistry, EngineConfig, HandlerToggles};
pub use domain::entities::{
    Authorization, Block, BlockHeader, BlockResult, Contract, ContractKind, Delegation, Provider,
    ProviderStatus, ServiceRecord, TxResult, ValidatorInfo, VoteInfo, MAX_SERVICE_ID,
};
pub use domain::errors::{ConfigError, EngineError, LedgerError, RegistryError, StoreError};
pub use domain::invariants::InvariantViolation;
pub use domain::messages::{
    claim_sign_bytes, Msg, MsgBondProvider, MsgClaimContractIncome, MsgCloseContract,
    MsgModProvider, MsgOpenContract, MsgRegisterService, MsgRemoveService, MsgSetVersion,
    MsgUpdateService, SignedMsg,
};
pub use events::Event;
pub use ports::{BalanceLedger, ContractQueryApi, KeyVerifier, KvOp, KvStore, LedgerOp, ValidatorRegistry};
pub use query::StoreQuery;
pub use service::ContractEngine;
