//! # TollGate Test Suite
//!
//! End-to-end flows driven through whole blocks.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Chain driver and signed message builders
//! └── integration/
//!     ├── scenarios.rs  # Provider and contract lifecycles
//!     ├── properties.rs # proptest invariants over message sequences
//!     ├── validators.rs # Payouts and protocol upgrades
//!     └── runtime.rs    # Node runtime: executor, requests, bootstrap
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p tg-tests
//!
//! # By area
//! cargo test -p tg-tests integration::scenarios::
//! cargo test -p tg-tests integration::validators::
//!
//! # Benchmarks
//! cargo bench -p tg-tests
//! ```
