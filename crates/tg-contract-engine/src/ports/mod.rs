//! Hexagonal ports: inbound query API and outbound collaborators.

pub mod inbound;
pub mod outbound;

pub use inbound::ContractQueryApi;
pub use outbound::{BalanceLedger, KeyVerifier, KvOp, KvStore, LedgerOp, ValidatorRegistry};
