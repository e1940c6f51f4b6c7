//! # Engine Configuration
//!
//! Every tunable the engine reads by name, grouped per protocol version.
//!
//! | Field | Default | Purpose |
//! |-------|---------|---------|
//! | `max_contract_length` | 5 256 000 | Ceiling on provider min/max durations |
//! | `max_supply` | 121M tokens | Supply cap checked at block end |
//! | `open_contract_cost` | 20 000 000 | Fee paid to the reserve on open |
//! | `min_provider_bond` | 1 token | Bond needed to accept contracts |
//! | `reserve_tax_bps` | 1000 | Reserve cut of every settlement |
//! | `blocks_per_year` | 6 311 520 | Emission schedule |
//! | `emission_curve` | 10 | Reserve fraction released per year |
//! | `validator_payout_cycle` | 1 | Blocks between payouts |
//! | `version_consensus_pct` | 90 | Validator share needed to bump versions |
//! | `service_authorities` | none | Accounts allowed to change the service registry |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::AccAddress;

use crate::domain::errors::{ConfigError, EngineError};

/// Basis points denominator.
pub const MAX_BASIS_POINTS: u128 = 10_000;

/// Smallest-unit multiplier of one whole token.
pub const TOKEN: u128 = 100_000_000;

/// Per-handler disable switches. `true` rejects every message of that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerToggles {
    pub bond_provider_disabled: bool,
    pub mod_provider_disabled: bool,
    pub open_contract_disabled: bool,
    pub close_contract_disabled: bool,
    pub claim_contract_income_disabled: bool,
    pub set_version_disabled: bool,
}

/// Configuration in force for one protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Handler disable switches.
    pub handlers: HandlerToggles,
    /// Ceiling for provider min/max contract durations, in blocks.
    pub max_contract_length: i64,
    /// Maximum native token supply.
    pub max_supply: u128,
    /// Fee debited from the client to the reserve when opening a contract.
    pub open_contract_cost: u128,
    /// Minimum provider bond to accept new contracts.
    pub min_provider_bond: u128,
    /// Reserve cut of each settlement, in basis points.
    pub reserve_tax_bps: u128,
    /// Blocks per year for the emission schedule.
    pub blocks_per_year: i64,
    /// Divisor applied to the reserve to get the yearly emission.
    pub emission_curve: u128,
    /// Validators are paid every this many blocks. Zero disables payouts.
    pub validator_payout_cycle: i64,
    /// Percentage of bonded validators needed to adopt a version.
    pub version_consensus_pct: u64,
    /// Maximum provider metadata URI length.
    pub max_metadata_uri_len: usize,
    /// Maximum claim signature length.
    pub max_signature_len: usize,
    /// Denomination used for bonds, fees and the supply cap.
    pub native_denom: String,
    /// Accounts that may register, update and remove services.
    pub service_authorities: Vec<AccAddress>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            handlers: HandlerToggles::default(),
            max_contract_length: 5_256_000,
            max_supply: 121_000_000 * TOKEN,
            open_contract_cost: 20_000_000,
            min_provider_bond: TOKEN,
            reserve_tax_bps: 1000,
            blocks_per_year: 6_311_520,
            emission_curve: 10,
            validator_payout_cycle: 1,
            version_consensus_pct: 90,
            max_metadata_uri_len: 100,
            max_signature_len: 100,
            native_denom: "utoll".to_string(),
            service_authorities: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn is_service_authority(&self, address: &AccAddress) -> bool {
        self.service_authorities.contains(address)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reserve_tax_bps > MAX_BASIS_POINTS {
            return Err(ConfigError::InvalidValue {
                field: "reserve_tax_bps",
                reason: format!("{} exceeds {}", self.reserve_tax_bps, MAX_BASIS_POINTS),
            });
        }
        if self.max_contract_length <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_contract_length",
                reason: "must be positive".to_string(),
            });
        }
        if self.blocks_per_year < 0 || self.validator_payout_cycle < 0 {
            return Err(ConfigError::InvalidValue {
                field: "blocks_per_year/validator_payout_cycle",
                reason: "cannot be negative".to_string(),
            });
        }
        if self.version_consensus_pct == 0 || self.version_consensus_pct > 100 {
            return Err(ConfigError::InvalidValue {
                field: "version_consensus_pct",
                reason: format!("{} not in 1..=100", self.version_consensus_pct),
            });
        }
        shared_types::Coin::new(self.native_denom.clone(), 0)
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                field: "native_denom",
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// Versioned configuration: protocol version -> config in force.
///
/// Version 0 has no configuration. A version without its own entry uses the
/// latest entry below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRegistry {
    versions: BTreeMap<i64, EngineConfig>,
}

impl ConfigRegistry {
    /// Registry with a single version-1 entry.
    pub fn new(v1: EngineConfig) -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(1, v1);
        Self { versions }
    }

    /// Register the config that takes effect from `version`.
    pub fn with_version(mut self, version: i64, config: EngineConfig) -> Result<Self, ConfigError> {
        if version < 1 {
            return Err(ConfigError::InvalidVersion(version));
        }
        config.validate()?;
        self.versions.insert(version, config);
        Ok(self)
    }

    /// Config in force for `version`.
    pub fn for_version(&self, version: i64) -> Result<&EngineConfig, EngineError> {
        if version < 1 {
            return Err(EngineError::UnsupportedVersion(version));
        }
        self.versions
            .range(..=version)
            .next_back()
            .map(|(_, config)| config)
            .ok_or(EngineError::UnsupportedVersion(version))
    }

    /// Highest version with its own entry.
    pub fn latest_version(&self) -> i64 {
        self.versions.keys().next_back().copied().unwrap_or(0)
    }

    /// Validate every entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (version, config) in &self.versions {
            if *version < 1 {
                return Err(ConfigError::InvalidVersion(*version));
            }
            config.validate()?;
        }
        Ok(())
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
