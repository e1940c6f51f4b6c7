//! Read-only views over a [`KvStore`]. Implements [`ContractQueryApi`].

use shared_types::{BlockHeight, PubKey, Service};
use tracing::debug;

use crate::domain::entities::{Contract, Provider, ServiceRecord};
use crate::domain::errors::EngineError;
use crate::ports::{ContractQueryApi, KvStore};
use crate::store::tables;

/// Queries over committed state.
///
/// Borrowed from [`crate::service::ContractEngine::queries`]; it never sees
/// the overlay of a block still executing.
pub struct StoreQuery<'a, K: KvStore + ?Sized> {
    store: &'a K,
}

impl<'a, K: KvStore + ?Sized> StoreQuery<'a, K> {
    pub fn new(store: &'a K) -> Self {
        Self { store }
    }
}

impl<K: KvStore + ?Sized> ContractQueryApi for StoreQuery<'_, K> {
    fn service(&self, name: &Service) -> Result<Option<ServiceRecord>, EngineError> {
        Ok(tables::get_service(self.store, name)?)
    }

    fn services(&self) -> Result<Vec<ServiceRecord>, EngineError> {
        Ok(tables::services(self.store)?)
    }

    fn provider(&self, pubkey: &PubKey, service: &Service) -> Result<Option<Provider>, EngineError> {
        Ok(tables::get_provider(self.store, pubkey, service)?)
    }

    fn providers(&self) -> Result<Vec<Provider>, EngineError> {
        Ok(tables::providers(self.store)?)
    }

    fn contract(&self, id: u64) -> Result<Option<Contract>, EngineError> {
        Ok(tables::get_contract(self.store, id)?)
    }

    fn active_contract(
        &self,
        spender: &PubKey,
        provider: &PubKey,
        service: &Service,
    ) -> Result<Option<Contract>, EngineError> {
        // Due contracts are swept at the end of every block, so between
        // blocks the spender index holds only unsettled contracts.
        Ok(self
            .spender_contracts(spender)?
            .into_iter()
            .find(|c| c.provider == *provider && c.service == *service && !c.is_settled()))
    }

    fn spender_contracts(&self, spender: &PubKey) -> Result<Vec<Contract>, EngineError> {
        let mut out = Vec::new();
        for id in tables::user_contract_ids(self.store, spender)? {
            match tables::get_contract(self.store, id)? {
                Some(contract) => out.push(contract),
                None => debug!(contract_id = id, "indexed contract missing"),
            }
        }
        Ok(out)
    }

    fn expiring_at(&self, height: BlockHeight) -> Result<Vec<u64>, EngineError> {
        Ok(tables::expiration_ids(self.store, height)?)
    }

    fn next_contract_id(&self) -> Result<u64, EngineError> {
        Ok(tables::next_contract_id(self.store)?)
    }

    fn protocol_version(&self) -> Result<i64, EngineError> {
        Ok(tables::get_version(self.store)?)
    }
}
