//! # Shared Types Crate
//!
//! Ledger primitives used by the contract engine, the node runtime and the
//! test suite.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: keys, addresses, coins and pool holders are
//!   defined once here.
//! - **Fixed-width identities**: public keys are 32 bytes, account addresses
//!   are 20 bytes, both rendered as lowercase hex in human-readable formats.
//! - **Integer amounts only**: every token amount is an unsigned 128-bit
//!   integer in the smallest denomination unit.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
