//! # Inbound Ports (Driving Side)
//!
//! Read-only queries over engine state. Writes only happen through
//! [`crate::service::ContractEngine::execute_block`].

use shared_types::{BlockHeight, PubKey, Service};

use crate::domain::entities::{Contract, Provider, ServiceRecord};
use crate::domain::errors::EngineError;

/// Read-only queries over the service registry, providers, contracts and
/// indexes.
pub trait ContractQueryApi {
    fn service(&self, name: &Service) -> Result<Option<ServiceRecord>, EngineError>;

    /// Every registered service, in name order.
    fn services(&self) -> Result<Vec<ServiceRecord>, EngineError>;

    /// Bonded provider record for `(pubkey, service)`.
    fn provider(&self, pubkey: &PubKey, service: &Service) -> Result<Option<Provider>, EngineError>;

    /// Every bonded provider, in key order.
    fn providers(&self) -> Result<Vec<Provider>, EngineError>;

    fn contract(&self, id: u64) -> Result<Option<Contract>, EngineError>;

    /// The unsettled contract of `spender` with this provider and service.
    fn active_contract(
        &self,
        spender: &PubKey,
        provider: &PubKey,
        service: &Service,
    ) -> Result<Option<Contract>, EngineError>;

    /// Contracts currently in the spender's active index.
    fn spender_contracts(&self, spender: &PubKey) -> Result<Vec<Contract>, EngineError>;

    /// Ids in the expiration bucket at `height`.
    fn expiring_at(&self, height: BlockHeight) -> Result<Vec<u64>, EngineError>;

    /// Id the next opened contract will get.
    fn next_contract_id(&self) -> Result<u64, EngineError>;

    /// Stored protocol version, 0 before genesis.
    fn protocol_version(&self) -> Result<i64, EngineError>;
}
