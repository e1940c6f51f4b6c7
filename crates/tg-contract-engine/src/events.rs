//! # Engine Events
//!
//! Flat attribute sets emitted by handlers and block hooks. Events recorded
//! inside a discarded scratch context are discarded with it.
//!
//! | Type | Emitted by |
//! |------|-----------|
//! | `bond_provider` | BondProvider |
//! | `provider_mod` | ModProvider |
//! | `open_contract` | OpenContract |
//! | `close_contract` | CloseContract |
//! | `contract_settlement` | every settlement (claim, close, sweep) |
//! | `validator_payout` | payout distributor |
//! | `set_version` | SetVersion |
//! | `protocol_upgrade` | begin-block version gate |
//! | `register_service` | RegisterService |
//! | `update_service` | UpdateService |
//! | `remove_service` | RemoveService |

use serde::{Deserialize, Serialize};
use shared_types::{AccAddress, BlockHeight, Coin, PubKey, Service};

use crate::domain::entities::{Contract, Provider, ServiceRecord};

/// A typed event with ordered string attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub ty: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(ty: &str) -> Self {
        Self {
            ty: ty.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// First value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn bond_provider(provider: &PubKey, service: &Service, bond_rel: i128, bond_abs: u128) -> Self {
        Event::new("bond_provider")
            .attr("provider", provider)
            .attr("service", service)
            .attr("bond_rel", bond_rel)
            .attr("bond_abs", bond_abs)
    }

    pub fn provider_mod(provider: &Provider) -> Self {
        Event::new("provider_mod")
            .attr("provider", provider.pubkey)
            .attr("service", &provider.service)
            .attr("metadata_uri", &provider.metadata_uri)
            .attr("metadata_nonce", provider.metadata_nonce)
            .attr("status", provider.status.as_str())
            .attr("min_contract_duration", provider.min_contract_duration)
            .attr("max_contract_duration", provider.max_contract_duration)
            .attr("subscription_rate", &provider.subscription_rate)
            .attr("pay_as_you_go_rate", &provider.pay_as_you_go_rate)
            .attr("bond", provider.bond)
            .attr("settlement_duration", provider.settlement_duration)
    }

    pub fn open_contract(contract: &Contract, open_cost: u128) -> Self {
        Event::new("open_contract")
            .attr("provider", contract.provider)
            .attr("contract_id", contract.id)
            .attr("service", &contract.service)
            .attr("client", contract.client)
            .attr("delegate", delegate_attr(contract))
            .attr("type", contract.kind.as_str())
            .attr("height", contract.height)
            .attr("duration", contract.duration)
            .attr("rate", &contract.rate)
            .attr("open_cost", open_cost)
            .attr("deposit", contract.deposit)
            .attr("settlement_duration", contract.settlement_duration)
    }

    pub fn close_contract(contract: &Contract) -> Self {
        Event::new("close_contract")
            .attr("contract_id", contract.id)
            .attr("provider", contract.provider)
            .attr("service", &contract.service)
            .attr("client", contract.client)
            .attr("delegate", delegate_attr(contract))
    }

    /// `paid` is the provider's share of this settlement, `reserve` the tax.
    pub fn contract_settlement(contract: &Contract, paid: u128, reserve: u128) -> Self {
        Event::new("contract_settlement")
            .attr("provider", contract.provider)
            .attr("contract_id", contract.id)
            .attr("service", &contract.service)
            .attr("client", contract.client)
            .attr("delegate", delegate_attr(contract))
            .attr("type", contract.kind.as_str())
            .attr("nonce", contract.nonce)
            .attr("height", contract.height)
            .attr("paid", paid)
            .attr("reserve", reserve)
    }

    pub fn validator_payout(validator: &AccAddress, reward: &Coin) -> Self {
        Event::new("validator_payout")
            .attr("validator", validator)
            .attr("reward", reward)
    }

    pub fn set_version(validator: &AccAddress, version: i64) -> Self {
        Event::new("set_version")
            .attr("validator", validator)
            .attr("version", version)
    }

    pub fn register_service(service: &ServiceRecord) -> Self {
        Event::service("register_service", service)
    }

    pub fn update_service(service: &ServiceRecord) -> Self {
        Event::service("update_service", service)
    }

    pub fn remove_service(name: &Service) -> Self {
        Event::new("remove_service").attr("name", name)
    }

    fn service(ty: &str, service: &ServiceRecord) -> Self {
        Event::new(ty)
            .attr("id", service.id)
            .attr("name", &service.name)
            .attr("description", &service.description)
            .attr("type", &service.service_type)
    }

    pub fn protocol_upgrade(from: i64, to: i64, height: BlockHeight) -> Self {
        Event::new("protocol_upgrade")
            .attr("from", from)
            .attr("to", to)
            .attr("height", height)
    }
}

fn delegate_attr(contract: &Contract) -> String {
    contract
        .delegate
        .map(|key| key.to_string())
        .unwrap_or_default()
}
