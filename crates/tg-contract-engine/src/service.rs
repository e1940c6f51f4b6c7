//! # Contract Engine Service
//!
//! Owns the collaborators and runs whole blocks.
//!
//! ## Block execution
//!
//! 0. Height check: every block must extend the last committed one by one
//! 1. Version gate (begin block)
//! 2. Each message in block order: validate, then apply in a scratch context
//! 3. Expiration sweep, validator payout, invariant check (end block)
//!
//! The whole block runs against a block-level overlay that is written to the
//! store and the ledger only when every step succeeded. A fatal invariant
//! failure therefore leaves the committed state exactly as it was before the
//! block.

use std::collections::HashSet;

use tracing::{error, info, warn};

use crate::domain::config::ConfigRegistry;
use crate::domain::entities::{Block, BlockResult, ServiceRecord, TxResult};
use crate::domain::errors::EngineError;
use crate::events::Event;
use crate::handlers;
use crate::lifecycle;
use crate::ports::{BalanceLedger, KeyVerifier, KvStore, ValidatorRegistry};
use crate::query::StoreQuery;
use crate::store::{tables, CacheKv, Ctx, LedgerCache};

/// The contract engine.
///
/// Every dependency is injected at construction.
pub struct ContractEngine<S, L, R, V>
where
    S: KvStore,
    L: BalanceLedger,
    R: ValidatorRegistry,
    V: KeyVerifier,
{
    /// Typed tables live here.
    store: S,
    /// Pool and account balances.
    ledger: L,
    /// Bonded validators and delegations.
    registry: R,
    /// Claim signature verification.
    verifier: V,
    /// Config per protocol version.
    configs: ConfigRegistry,
}

impl<S, L, R, V> ContractEngine<S, L, R, V>
where
    S: KvStore,
    L: BalanceLedger,
    R: ValidatorRegistry,
    V: KeyVerifier,
{
    pub fn new(store: S, ledger: L, registry: R, verifier: V, configs: ConfigRegistry) -> Self {
        Self {
            store,
            ledger,
            registry,
            verifier,
            configs,
        }
    }

    /// Store `version` as the protocol version of a fresh chain and seed the
    /// service registry.
    ///
    /// A store that already carries a version keeps it and its registry.
    pub fn init_genesis(&mut self, version: i64, services: &[ServiceRecord]) -> Result<i64, EngineError> {
        let current = tables::get_version(&self.store)?;
        if current != 0 {
            info!(version = current, "store already initialised");
            return Ok(current);
        }
        self.configs.for_version(version)?;

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for service in services {
            if !service.has_valid_id() {
                return Err(EngineError::InvalidServiceId(service.id));
            }
            if !names.insert(&service.name) {
                return Err(EngineError::ServiceNameTaken(service.name.to_string()));
            }
            if !ids.insert(service.id) {
                return Err(EngineError::ServiceIdTaken(service.id));
            }
        }
        for service in services {
            tables::set_service(&mut self.store, service)?;
        }
        tables::set_version(&mut self.store, version)?;
        info!(version, services = services.len(), "genesis state written");
        Ok(version)
    }

    /// Execute one block and commit it.
    ///
    /// Rejected messages are reported in their [`TxResult`]. An `Err` means
    /// nothing from this block was committed; when it is fatal the host must
    /// stop producing blocks. The first block is height 1 and each later block
    /// must be exactly one above the last committed height.
    pub fn execute_block(&mut self, block: &Block) -> Result<BlockResult, EngineError> {
        let height = block.header.height;
        let Self {
            store,
            ledger,
            registry,
            verifier,
            configs,
        } = self;

        let expected = tables::get_last_height(&*store)?
            .checked_add(1)
            .ok_or(EngineError::Overflow("block height"))?;
        if height != expected {
            warn!(height, expected, "block out of sequence, refused");
            return Err(EngineError::UnexpectedHeight {
                expected,
                actual: height,
            });
        }

        let mut kv = CacheKv::new(&*store);
        let mut pending = LedgerCache::new(&*ledger);

        let (version, upgrade) = lifecycle::version_gate(&mut kv, &*registry, configs, height)?;
        let config = configs.for_version(version)?;

        let mut ctx = Ctx::new(&mut kv, &mut pending, &*verifier, &block.header, config);

        let mut tx_results = Vec::with_capacity(block.txs.len());
        for (index, tx) in block.txs.iter().enumerate() {
            let outcome = handlers::dispatch(&mut ctx, tx);
            let events = ctx.take_events();
            tx_results.push(TxResult {
                index,
                error: outcome.err().map(|e| e.to_string()),
                events,
            });
        }

        if let Err(err) = lifecycle::end_block(&mut ctx, &*registry, &block.votes) {
            if err.is_fatal() {
                error!(height, error = %err, "end block failed, block discarded");
            } else {
                warn!(height, error = %err, "end block failed, block discarded");
            }
            return Err(err);
        }

        let mut block_events: Vec<Event> = upgrade.into_iter().collect();
        block_events.extend(ctx.take_events());
        drop(ctx);

        tables::set_last_height(&mut kv, height)?;
        let kv_ops = kv.into_ops();
        let ledger_ops = pending.into_ops();
        store.write_batch(kv_ops)?;
        ledger.apply(ledger_ops)?;

        let rejected = tx_results.iter().filter(|r| !r.is_ok()).count();
        info!(
            height,
            version,
            txs = tx_results.len(),
            rejected,
            events = block_events.len(),
            "block committed"
        );

        Ok(BlockResult {
            height,
            protocol_version: version,
            tx_results,
            block_events,
        })
    }

    /// Read-only queries over committed state.
    pub fn queries(&self) -> StoreQuery<'_, S> {
        StoreQuery::new(&self.store)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for genesis funding.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn configs(&self) -> &ConfigRegistry {
        &self.configs
    }
}
