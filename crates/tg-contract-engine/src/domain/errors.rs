//! # Error Types
//!
//! Errors fall into three tiers:
//!
//! 1. **Validation** - the message is rejected before any state mutation and
//!    the chain carries on.
//! 2. **Fatal** - an end-of-block solvency or supply invariant failed; block
//!    production must halt.
//! 3. **Isolated** - a single contract failed to settle during the expiration
//!    sweep; it is logged and the sweep continues.
//!
//! Collaborator failures (`StoreError`, `LedgerError`, `RegistryError`) wrap
//! into [`EngineError`] through `#[from]`.

use shared_types::{AccAddress, BlockHeight, Coin, Holder, TypeError};
use thiserror::Error;

use crate::domain::invariants::InvariantViolation;

// =============================================================================
// COLLABORATOR ERRORS
// =============================================================================

/// Key/value backend failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend reported an I/O or engine error.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("store codec error: {0}")]
    Codec(String),
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

/// Balance ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The source holder does not have enough of the denomination.
    #[error("insufficient funds: {holder} has {available}, needs {required}")]
    InsufficientFunds {
        holder: Holder,
        required: Coin,
        available: u128,
    },

    /// An amount or supply computation overflowed.
    #[error("ledger arithmetic overflow for {0}")]
    Overflow(String),
}

/// Validator registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry could not be read.
    #[error("validator registry unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value outside its accepted range.
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// A registry entry was keyed by a version below 1.
    #[error("config registry versions start at 1, got {0}")]
    InvalidVersion(i64),
}

// =============================================================================
// ENGINE ERRORS
// =============================================================================

/// Every error the engine can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    // --- stateless validation ---------------------------------------------
    /// Signer is not the account the message acts for.
    #[error("signer {signer} is not {expected}")]
    SignerMismatch {
        signer: AccAddress,
        expected: AccAddress,
    },

    /// Bond delta must be non-zero.
    #[error("invalid bond: delta cannot be zero")]
    InvalidBond,

    /// Metadata URI exceeds the configured maximum length.
    #[error("metadata uri too long ({len}/{max})")]
    InvalidMetadataUri { len: usize, max: usize },

    /// Duration fields are malformed.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// Rate fields are malformed.
    #[error("invalid rate: {0}")]
    InvalidRate(String),

    /// Deposit must be positive.
    #[error("invalid deposit: must be positive")]
    InvalidDeposit,

    /// Claim nonce must be positive.
    #[error("invalid nonce: must be positive")]
    InvalidNonce,

    /// Chain id must be non-empty.
    #[error("invalid chain id: cannot be empty")]
    InvalidChainId,

    /// Signature expiry height must be positive.
    #[error("invalid signature expiry height: {0}")]
    InvalidSignatureExpiry(BlockHeight),

    /// Signature exceeds the configured maximum length.
    #[error("signature too long ({len}/{max})")]
    SignatureTooLong { len: usize, max: usize },

    /// Announced version must be positive.
    #[error("invalid version: {0}")]
    InvalidVersion(i64),

    /// Service ids run from 1 to `i32::MAX`.
    #[error("invalid service id: {0}")]
    InvalidServiceId(u64),

    /// Malformed shared primitive.
    #[error(transparent)]
    Type(#[from] TypeError),

    // --- block context ----------------------------------------------------
    /// Blocks must arrive one height after the last committed block.
    #[error("unexpected block height {actual}, expected {expected}")]
    UnexpectedHeight {
        expected: BlockHeight,
        actual: BlockHeight,
    },

    // --- stateful validation ----------------------------------------------
    /// Signer may not change the service registry.
    #[error("unauthorized: {0} is not a service registry authority")]
    Unauthorized(AccAddress),

    /// No registered service with this name.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// A registered service already uses this name.
    #[error("service name already exists: {0}")]
    ServiceNameTaken(String),

    /// A registered service already uses this id.
    #[error("service id already exists: {0}")]
    ServiceIdTaken(u64),

    /// Update names an existing service under a different id.
    #[error("id mismatch for service {service}: have {expected}, got {actual}")]
    ServiceIdMismatch {
        service: String,
        expected: u64,
        actual: u64,
    },

    /// Handler is administratively disabled.
    #[error("disabled handler: {0}")]
    DisabledHandler(&'static str),

    /// No bonded provider for (pubkey, service).
    #[error("provider not found: {provider} / {service}")]
    ProviderNotFound { provider: String, service: String },

    /// Bond too small to withdraw or to open contracts against.
    #[error("insufficient bond: requested {requested}, available {available}")]
    InsufficientBond { requested: u128, available: u128 },

    /// Provider is offline.
    #[error("bad provider status: provider is offline")]
    BadProviderStatus,

    /// Duration outside the allowed window.
    #[error("contract duration {duration} outside [{min}, {max}]")]
    ContractDuration {
        duration: i64,
        min: i64,
        max: i64,
    },

    /// Requested rate is not one of the provider's published rates.
    #[error("mismatch rate: {0} is not offered for this contract type")]
    MismatchRate(Coin),

    /// Requested settlement grace differs from the provider's.
    #[error("mismatch settlement duration: expected {expected}, got {actual}")]
    MismatchSettlementDuration { expected: i64, actual: i64 },

    /// Subscription deposit must equal rate x duration.
    #[error("mismatch deposit: expected {expected}, got {actual}")]
    MismatchDeposit { expected: u128, actual: u128 },

    /// An open contract already exists for (provider, service, spender).
    #[error("contract already open: id {0}")]
    AlreadyOpen(u64),

    /// Pay-as-you-go contracts require closed authorization.
    #[error("pay-as-you-go contracts cannot use open authorization")]
    OpenPayAsYouGoAuthorization,

    /// No contract with this id.
    #[error("contract not found: id {0}")]
    ContractNotFound(u64),

    /// Only the client may close a contract.
    #[error("close unauthorized: only the client can close the contract")]
    CloseUnauthorized,

    /// Contract is settled, expired or already in its settlement window.
    #[error("contract already closed: id {0}")]
    CloseAlreadyClosed(u64),

    /// Delegate argument does not match the stored delegate.
    #[error("delegate mismatch for contract {0}")]
    DelegateMismatch(u64),

    /// Claim nonce does not strictly increase.
    #[error("bad nonce: stored {stored}, received {received}")]
    BadNonce { stored: i64, received: i64 },

    /// Contract is fully paid or settled.
    #[error("contract closed: id {0}")]
    ContractClosed(u64),

    /// Claim authorization has expired.
    #[error("signature expired at {expires_at}, current height {height}")]
    SignatureExpired {
        expires_at: BlockHeight,
        height: BlockHeight,
    },

    /// Claim was signed for a different chain.
    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: String, actual: String },

    /// Claim signature does not verify against the spender key.
    #[error("invalid signature")]
    InvalidSignature,

    /// Announced version is not above the validator's current one.
    #[error("cannot move version from {current} to {requested}")]
    VersionNotIncreasing { current: i64, requested: i64 },

    /// No configuration exists for this protocol version.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(i64),

    // --- internal ---------------------------------------------------------
    /// Checked arithmetic failed.
    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    /// Store collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Ledger collaborator failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Registry collaborator failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    // --- fatal ------------------------------------------------------------
    /// End-of-block solvency or supply check failed. Block production halts.
    #[error("invariant broken: {violations:?}")]
    InvariantBroken { violations: Vec<InvariantViolation> },
}

impl EngineError {
    /// Whether this error must halt block production.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::InvariantBroken { .. })
    }
}
