//! # Store Layer
//!
//! Typed tables over the [`KvStore`](crate::ports::KvStore) port, the scratch
//! overlays and the execution context that commits them.

pub mod cache;
pub mod context;
pub mod tables;

pub use cache::{CacheKv, LedgerCache};
pub use context::Ctx;
