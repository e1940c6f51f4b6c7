//! # Domain Layer
//!
//! Pure marketplace logic. Nothing here touches storage or the ledger.
//!
//! ## Modules
//!
//! - `entities` - Providers, contracts, validators and blocks
//! - `messages` - Wire messages and stateless validation
//! - `settlement` - Debt computation and the provider/reserve split
//! - `payout` - Validator reward planning
//! - `invariants` - End-of-block solvency checks
//! - `version` - Protocol version consensus
//! - `config` - Tunables per protocol version
//! - `math` - Share math with 256-bit intermediates
//! - `errors` - Error types

pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod math;
pub mod messages;
pub mod payout;
pub mod settlement;
pub mod version;
