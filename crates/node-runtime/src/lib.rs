//! # Node Runtime Library
//!
//! Exposes the runtime pieces for the binary and for tests.
//!
//! - `container/` - configuration and engine assembly
//! - `executor` - the single task that owns the engine
//! - `request` - newline-delimited JSON requests read by the binary

pub mod container;
pub mod executor;
pub mod request;

pub use container::{build_engine, BootstrapError, NodeConfig, NodeEngine, StorageBackend};
pub use executor::{spawn, ExecutorError, ExecutorHandle, Query, QueryResponse};
pub use request::{Request, Response};
