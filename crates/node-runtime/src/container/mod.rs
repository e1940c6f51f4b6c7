//! # Engine Container
//!
//! Builds the contract engine from a [`NodeConfig`]: opens the store, mints
//! dev balances, loads the validator set and writes the genesis version.

pub mod config;

use shared_types::Holder;
use thiserror::Error;
use tg_contract_engine::{
    BalanceLedger, ContractEngine, Ed25519Verifier, EngineError, InMemoryKvStore, InMemoryLedger,
    KvStore, LedgerError, StaticValidatorRegistry, StoreError,
};
use tracing::info;

pub use config::{ConfigError, DevBalance, NodeConfig, StorageBackend};

/// Key/value backend chosen at runtime.
pub type DynStore = Box<dyn KvStore + Send>;

/// The engine as the node runs it.
pub type NodeEngine = ContractEngine<DynStore, InMemoryLedger, StaticValidatorRegistry, Ed25519Verifier>;

/// Start-up failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage: {0}")]
    Storage(#[from] StoreError),

    #[error("dev funding: {0}")]
    Funding(#[from] LedgerError),

    #[error("genesis: {0}")]
    Genesis(#[from] EngineError),

    /// RocksDB was configured but the node was built without it.
    #[error("storage backend {0} not compiled in, rebuild with --features rocksdb")]
    BackendUnavailable(&'static str),
}

/// Open the configured key/value backend.
pub fn open_store(backend: &StorageBackend) -> Result<DynStore, BootstrapError> {
    match backend {
        StorageBackend::Memory => {
            info!("using in-memory store");
            Ok(Box::new(InMemoryKvStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb { path } => {
            use tg_contract_engine::{RocksKvConfig, RocksKvStore};
            info!(path = %path.display(), "opening RocksDB store");
            Ok(Box::new(RocksKvStore::open(path, RocksKvConfig::default())?))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb { .. } => Err(BootstrapError::BackendUnavailable("rocksdb")),
    }
}

/// Assemble a ready-to-run engine.
pub fn build_engine(config: &NodeConfig) -> Result<NodeEngine, BootstrapError> {
    let store = open_store(&config.storage)?;

    let mut ledger = InMemoryLedger::new();
    for balance in &config.dev_balances {
        ledger.mint(&Holder::Account(balance.address), &balance.coin)?;
        info!(address = %balance.address, amount = %balance.coin, "dev balance minted");
    }

    let registry = StaticValidatorRegistry::new(config.validators.clone());
    let mut engine = ContractEngine::new(
        store,
        ledger,
        registry,
        Ed25519Verifier,
        config.config_registry()?,
    );
    let version = engine.init_genesis(config.genesis_version, &config.genesis_services)?;
    info!(
        version,
        services = config.genesis_services.len(),
        validators = config.validators.len(),
        dev_balances = config.dev_balances.len(),
        "engine ready"
    );
    Ok(engine)
}
