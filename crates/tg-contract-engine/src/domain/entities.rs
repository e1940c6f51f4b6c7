//! # Domain Entities
//!
//! Registered services, providers, contracts, validator views and the blocks
//! the engine executes.

use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, BlockHeight, Coin, Coins, PubKey, Service};

use crate::domain::messages::SignedMsg;
use crate::events::Event;

// =============================================================================
// SERVICES
// =============================================================================

/// Highest id a registered service may carry.
pub const MAX_SERVICE_ID: u64 = i32::MAX as u64;

/// A service providers may bond against. Name and id are both unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: u64,
    pub name: Service,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_type: String,
}

impl ServiceRecord {
    pub fn new(id: u64, name: Service) -> Self {
        Self {
            id,
            name,
            description: String::new(),
            service_type: String::new(),
        }
    }

    /// Ids run from 1 to [`MAX_SERVICE_ID`].
    pub fn has_valid_id(&self) -> bool {
        (1..=MAX_SERVICE_ID).contains(&self.id)
    }
}

// =============================================================================
// PROVIDERS
// =============================================================================

/// Whether a provider accepts new contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Online,
    #[default]
    Offline,
}

impl ProviderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Online => "online",
            ProviderStatus::Offline => "offline",
        }
    }
}

/// A bonded seller of access to one service.
///
/// Identity is `(pubkey, service)`. The record exists iff `bond > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub pubkey: PubKey,
    pub service: Service,
    pub bond: u128,
    pub status: ProviderStatus,
    pub min_contract_duration: i64,
    pub max_contract_duration: i64,
    /// Grace window after a pay-as-you-go close during which a final claim
    /// can still land.
    pub settlement_duration: i64,
    pub subscription_rate: Coins,
    pub pay_as_you_go_rate: Coins,
    pub pay_as_you_go_enabled: bool,
    pub metadata_uri: String,
    pub metadata_nonce: u64,
    pub last_update: BlockHeight,
}

impl Provider {
    /// A fresh, offline, unbonded record.
    pub fn new(pubkey: PubKey, service: Service) -> Self {
        Self {
            pubkey,
            service,
            bond: 0,
            status: ProviderStatus::Offline,
            min_contract_duration: 0,
            max_contract_duration: 0,
            settlement_duration: 0,
            subscription_rate: Coins::default(),
            pay_as_you_go_rate: Coins::default(),
            pay_as_you_go_enabled: false,
            metadata_uri: String::new(),
            metadata_nonce: 0,
            last_update: 0,
        }
    }

    /// Published rates for a contract kind. Pay-as-you-go rates are withdrawn
    /// while pay-as-you-go is disabled.
    pub fn rates_for(&self, kind: ContractKind) -> Option<&Coins> {
        match kind {
            ContractKind::Subscription => Some(&self.subscription_rate),
            ContractKind::PayAsYouGo if self.pay_as_you_go_enabled => Some(&self.pay_as_you_go_rate),
            ContractKind::PayAsYouGo => None,
        }
    }
}

// =============================================================================
// CONTRACTS
// =============================================================================

/// How a contract accrues debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// `rate` per elapsed block.
    Subscription,
    /// `rate` per unit of reported usage (the claim nonce).
    PayAsYouGo,
}

impl ContractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::Subscription => "subscription",
            ContractKind::PayAsYouGo => "pay_as_you_go",
        }
    }
}

/// Who may trigger settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    /// Claims must carry the spender's signature.
    Closed,
    /// Anyone may trigger settlement without a signature.
    Open,
}

/// An escrow agreement between a provider and a spender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: u64,
    pub provider: PubKey,
    pub service: Service,
    pub client: PubKey,
    pub delegate: Option<PubKey>,
    pub kind: ContractKind,
    pub authorization: Authorization,
    /// Open height.
    pub height: BlockHeight,
    pub duration: i64,
    pub settlement_duration: i64,
    pub rate: Coin,
    pub deposit: u128,
    pub paid: u128,
    pub nonce: i64,
    pub queries_per_minute: u64,
    /// Zero until finalized; never changes afterwards.
    pub settlement_height: BlockHeight,
    /// Height of a pay-as-you-go close that opened the settlement window.
    pub closed_height: BlockHeight,
}

impl Contract {
    /// The key authorized to submit usage claims.
    pub fn spender(&self) -> PubKey {
        self.delegate.unwrap_or(self.client)
    }

    /// Natural end of the contract.
    pub fn expiration(&self) -> BlockHeight {
        self.height.saturating_add(self.duration)
    }

    /// Height of the expiration bucket holding this contract.
    pub fn due_height(&self) -> BlockHeight {
        if self.is_closing() {
            self.closed_height.saturating_add(self.settlement_duration)
        } else {
            self.expiration()
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settlement_height != 0
    }

    /// A pay-as-you-go close is pending.
    pub fn is_closing(&self) -> bool {
        self.closed_height != 0
    }

    /// Escrow still owed to either side.
    pub fn outstanding(&self) -> u128 {
        self.deposit.saturating_sub(self.paid)
    }

    /// Counts against the one-open-contract-per-(provider, service, spender) rule.
    pub fn is_active_at(&self, height: BlockHeight) -> bool {
        !self.is_settled() && height <= self.due_height()
    }
}

// =============================================================================
// VALIDATORS
// =============================================================================

/// Stake delegated to a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: AccAddress,
    pub shares: u128,
}

/// Registry view of one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    /// Operator account; receives commission.
    pub address: AccAddress,
    pub delegator_shares: u128,
    pub commission_rate_bps: u128,
    pub bonded: bool,
    pub jailed: bool,
    pub delegations: Vec<Delegation>,
}

impl ValidatorInfo {
    /// Bonded and not jailed.
    pub fn is_eligible(&self) -> bool {
        self.bonded && !self.jailed
    }
}

/// Whether a validator signed the previous block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub validator: AccAddress,
    pub signed_last_block: bool,
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Deterministic block context. The only source of height and chain id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: BlockHeight,
    pub chain_id: String,
}

/// An agreed, totally ordered batch of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub txs: Vec<SignedMsg>,
    #[serde(default)]
    pub votes: Vec<VoteInfo>,
}

/// Outcome of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxResult {
    pub index: usize,
    /// `None` on success, the rejection reason otherwise.
    pub error: Option<String>,
    pub events: Vec<Event>,
}

impl TxResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockResult {
    pub height: BlockHeight,
    pub protocol_version: i64,
    pub tx_results: Vec<TxResult>,
    /// Events emitted by begin/end block hooks.
    pub block_events: Vec<Event>,
}
