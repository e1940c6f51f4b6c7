//! # Node Configuration
//!
//! Defaults, then an optional JSON file, then environment overrides.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TG_CONFIG_FILE` | JSON file loaded before the other overrides |
//! | `TG_STORAGE` | `memory` or `rocksdb` |
//! | `TG_DATA_DIR` | RocksDB path |
//! | `TG_CHANNEL_CAPACITY` | executor queue depth |
//! | `TG_GENESIS_VERSION` | protocol version of a fresh store |
//! | `TG_DEV_BALANCES` | `addr=1000utoll,addr=5uatom` minted at start-up |
//! | `TG_GENESIS_SERVICES` | `1=btc-mainnet,2=eth-mainnet` registered in a fresh store |
//! | `TG_SERVICE_AUTHORITIES` | `addr,addr` allowed to change the service registry |
//! | `TG_RESERVE_TAX_BPS` | `engine.reserve_tax_bps` |
//! | `TG_PAYOUT_CYCLE` | `engine.validator_payout_cycle` |

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, Coin, Service};
use thiserror::Error;
use tg_contract_engine::{ConfigRegistry, EngineConfig, ServiceRecord, ValidatorInfo};
use tracing::info;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Engine config for protocol version 1.
    pub engine: EngineConfig,
    /// Configs taking effect from later protocol versions.
    pub upgrades: BTreeMap<i64, EngineConfig>,
    /// Protocol version written to a fresh store.
    pub genesis_version: i64,
    /// Services registered in a fresh store.
    pub genesis_services: Vec<ServiceRecord>,
    /// Key/value backend.
    pub storage: StorageBackend,
    /// Bounded executor queue depth.
    pub channel_capacity: usize,
    /// Balances minted into the ledger at start-up.
    pub dev_balances: Vec<DevBalance>,
    /// Static validator set.
    pub validators: Vec<ValidatorInfo>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            upgrades: BTreeMap::new(),
            genesis_version: 1,
            genesis_services: Vec::new(),
            storage: StorageBackend::Memory,
            channel_capacity: 64,
            dev_balances: Vec::new(),
            validators: Vec::new(),
        }
    }
}

/// Key/value backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    #[serde(rename = "rocksdb")]
    RocksDb { path: PathBuf },
}

/// A balance minted at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevBalance {
    pub address: AccAddress,
    pub coin: Coin,
}

impl FromStr for DevBalance {
    type Err = ConfigError;

    /// Parse `<hex address>=<amount><denom>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidEnv {
            var: "TG_DEV_BALANCES",
            value: s.to_string(),
        };
        let (address, coin) = s.trim().split_once('=').ok_or_else(invalid)?;
        Ok(Self {
            address: address.parse().map_err(|_| invalid())?,
            coin: coin.parse().map_err(|_| invalid())?,
        })
    }
}

/// Parse `<id>=<name>`.
fn parse_service(entry: &str) -> Result<ServiceRecord, ConfigError> {
    let invalid = || ConfigError::InvalidEnv {
        var: "TG_GENESIS_SERVICES",
        value: entry.to_string(),
    };
    let (id, name) = entry.trim().split_once('=').ok_or_else(invalid)?;
    let id = id.trim().parse().map_err(|_| invalid())?;
    let name = Service::new(name.trim()).map_err(|_| invalid())?;
    Ok(ServiceRecord::new(id, name))
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`NodeConfig`].
    #[error("cannot parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    /// An engine config entry failed validation.
    #[error(transparent)]
    Engine(#[from] tg_contract_engine::ConfigError),

    /// A node-level field is out of range.
    #[error("invalid node config: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Defaults, the `TG_CONFIG_FILE` file if set, then `TG_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// [`NodeConfig::load`] over an arbitrary variable lookup.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("TG_CONFIG_FILE") {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TG_STORAGE") {
            self.storage = match value.as_str() {
                "memory" => StorageBackend::Memory,
                "rocksdb" => StorageBackend::RocksDb {
                    path: lookup("TG_DATA_DIR")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("./data")),
                },
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "TG_STORAGE",
                        value,
                    })
                }
            };
        } else if let (Some(dir), StorageBackend::RocksDb { path }) =
            (lookup("TG_DATA_DIR"), &mut self.storage)
        {
            *path = PathBuf::from(dir);
        }

        if let Some(value) = lookup("TG_CHANNEL_CAPACITY") {
            self.channel_capacity = parse_env("TG_CHANNEL_CAPACITY", value)?;
        }
        if let Some(value) = lookup("TG_GENESIS_VERSION") {
            self.genesis_version = parse_env("TG_GENESIS_VERSION", value)?;
        }
        if let Some(value) = lookup("TG_RESERVE_TAX_BPS") {
            self.engine.reserve_tax_bps = parse_env("TG_RESERVE_TAX_BPS", value)?;
        }
        if let Some(value) = lookup("TG_PAYOUT_CYCLE") {
            self.engine.validator_payout_cycle = parse_env("TG_PAYOUT_CYCLE", value)?;
        }
        if let Some(value) = lookup("TG_DEV_BALANCES") {
            self.dev_balances = value
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(DevBalance::from_str)
                .collect::<Result<_, _>>()?;
        }
        if let Some(value) = lookup("TG_GENESIS_SERVICES") {
            self.genesis_services = value
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(parse_service)
                .collect::<Result<_, _>>()?;
        }
        if let Some(value) = lookup("TG_SERVICE_AUTHORITIES") {
            self.engine.service_authorities = value
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(|entry| parse_env("TG_SERVICE_AUTHORITIES", entry.to_string()))
                .collect::<Result<_, _>>()?;
        }
        Ok(())
    }

    /// Reject configurations the node cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be positive".to_string(),
            ));
        }
        if self.genesis_version < 1 {
            return Err(ConfigError::Invalid(format!(
                "genesis_version {} must be at least 1",
                self.genesis_version
            )));
        }
        if let Some(service) = self.genesis_services.iter().find(|s| !s.has_valid_id()) {
            return Err(ConfigError::Invalid(format!(
                "genesis service {} has id {} outside 1..={}",
                service.name,
                service.id,
                tg_contract_engine::MAX_SERVICE_ID
            )));
        }
        for balance in &self.dev_balances {
            balance
                .coin
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        self.config_registry()?;
        Ok(())
    }

    /// Engine configs keyed by the version they take effect from.
    pub fn config_registry(&self) -> Result<ConfigRegistry, ConfigError> {
        let mut registry = ConfigRegistry::new(self.engine.clone());
        for (version, config) in &self.upgrades {
            registry = registry.with_version(*version, config.clone())?;
        }
        registry.validate()?;
        Ok(registry)
    }
}

fn parse_env<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
