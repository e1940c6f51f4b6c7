//! # Execution Context
//!
//! Everything a handler or block hook may touch: the key/value store, the
//! balance ledger, the signature verifier, the block header and the
//! configuration in force. Height and chain id come only from the header.
//!
//! [`Ctx::with_cache`] runs a closure against scratch overlays and merges
//! them into this context only when the closure succeeds.

use shared_types::BlockHeight;

use crate::domain::config::EngineConfig;
use crate::domain::entities::BlockHeader;
use crate::domain::errors::EngineError;
use crate::events::Event;
use crate::ports::{BalanceLedger, KeyVerifier, KvStore};
use crate::store::cache::{CacheKv, LedgerCache};

pub struct Ctx<'a> {
    store: &'a mut dyn KvStore,
    ledger: &'a mut dyn BalanceLedger,
    verifier: &'a dyn KeyVerifier,
    header: &'a BlockHeader,
    config: &'a EngineConfig,
    events: Vec<Event>,
}

impl<'a> Ctx<'a> {
    pub fn new(
        store: &'a mut dyn KvStore,
        ledger: &'a mut dyn BalanceLedger,
        verifier: &'a dyn KeyVerifier,
        header: &'a BlockHeader,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            verifier,
            header,
            config,
            events: Vec::new(),
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.header.height
    }

    pub fn chain_id(&self) -> &str {
        &self.header.chain_id
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    pub fn ledger(&self) -> &dyn BalanceLedger {
        &*self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut dyn BalanceLedger {
        &mut *self.ledger
    }

    pub fn verifier(&self) -> &dyn KeyVerifier {
        self.verifier
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Drain the events recorded so far.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Run `f` in a scratch copy of this context.
    ///
    /// On `Ok` the scratch writes, ledger mutations and events are merged
    /// into `self`. On `Err` they are dropped and `self` is untouched.
    pub fn with_cache<T, F>(&mut self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Ctx<'_>) -> Result<T, EngineError>,
    {
        let mut kv = CacheKv::new(&*self.store);
        let mut ledger = LedgerCache::new(&*self.ledger);
        let mut scratch = Ctx {
            store: &mut kv,
            ledger: &mut ledger,
            verifier: self.verifier,
            header: self.header,
            config: self.config,
            events: Vec::new(),
        };

        let value = f(&mut scratch)?;
        let events = scratch.events;

        let kv_ops = kv.into_ops();
        let ledger_ops = ledger.into_ops();
        self.store.write_batch(kv_ops)?;
        self.ledger.apply(ledger_ops)?;
        self.events.extend(events);
        Ok(value)
    }
}
