//! # Error Types
//!
//! Parsing and validation errors for the shared primitives.

use thiserror::Error;

/// Errors raised while parsing or validating shared primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Hex input could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded byte string has the wrong width.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Service name is empty, too long or contains characters outside `[a-z0-9_-]`.
    #[error("invalid service name: {0:?}")]
    InvalidService(String),

    /// Coin string is not `<amount><denom>`.
    #[error("invalid coin: {0:?}")]
    InvalidCoin(String),

    /// Denomination is empty or not a lowercase identifier.
    #[error("invalid denom: {0:?}")]
    InvalidDenom(String),
}
