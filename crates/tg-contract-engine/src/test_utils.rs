//! Shared fixtures for handler and lifecycle unit tests.

use shared_crypto::Ed25519KeyPair;
use shared_types::{AccAddress, BlockHeight, Coin, Coins, Holder, PubKey, Service};

use crate::adapters::{Ed25519Verifier, InMemoryKvStore, InMemoryLedger};
use crate::domain::config::EngineConfig;
use crate::domain::entities::{Authorization, BlockHeader, ContractKind, ProviderStatus, ServiceRecord};
use crate::domain::errors::EngineError;
use crate::domain::messages::{
    claim_sign_bytes, Msg, MsgBondProvider, MsgClaimContractIncome, MsgCloseContract,
    MsgModProvider, MsgOpenContract, MsgRegisterService, MsgRemoveService, MsgSetVersion,
    MsgUpdateService, SignedMsg,
};
use crate::events::Event;
use crate::handlers;
use crate::ports::BalanceLedger;
use crate::store::{tables, Ctx};

pub const CHAIN_ID: &str = "tollgate-test";
pub const DENOM: &str = "utoll";
pub const MIN_BOND: u128 = 1_000;

pub fn service() -> Service {
    Service::new("btc-mainnet").unwrap()
}

pub fn provider_key() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([1; 32])
}

pub fn client_key() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([2; 32])
}

pub fn delegate_key() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([3; 32])
}

/// The only service registry authority of [`Harness`].
pub fn authority_key() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([9; 32])
}

/// Store, ledger and config driven one message at a time.
pub struct Harness {
    pub store: InMemoryKvStore,
    pub ledger: InMemoryLedger,
    pub config: EngineConfig,
    pub provider: Ed25519KeyPair,
}

impl Harness {
    /// Empty state with [`service`] registered under id 1.
    pub fn new() -> Self {
        let mut store = InMemoryKvStore::new();
        tables::set_service(&mut store, &ServiceRecord::new(1, service())).unwrap();
        Self {
            store,
            ledger: InMemoryLedger::new(),
            config: EngineConfig {
                open_contract_cost: 0,
                min_provider_bond: MIN_BOND,
                service_authorities: vec![authority_key().address()],
                ..EngineConfig::default()
            },
            provider: provider_key(),
        }
    }

    /// Harness with `provider_key()` bonded at `MIN_BOND` and publishing
    /// `terms`. The provider account is left empty.
    pub fn with_provider(terms: Terms) -> Self {
        let mut h = Self::new();
        h.fund(h.provider.address(), MIN_BOND);
        h.exec(1, &bond(&h.provider, MIN_BOND as i128)).unwrap();
        h.exec(1, &mod_provider(&h.provider, terms)).unwrap();
        h
    }

    pub fn fund(&mut self, address: AccAddress, amount: u128) {
        self.ledger
            .mint(&Holder::Account(address), &Coin::new(DENOM, amount))
            .unwrap();
    }

    pub fn exec(&mut self, height: BlockHeight, tx: &SignedMsg) -> Result<Vec<Event>, EngineError> {
        self.with_ctx(height, |ctx| -> Result<Vec<Event>, EngineError> {
            handlers::dispatch(ctx, tx)?;
            Ok(ctx.take_events())
        })
    }

    pub fn with_ctx<T>(&mut self, height: BlockHeight, f: impl FnOnce(&mut Ctx<'_>) -> T) -> T {
        let header = BlockHeader {
            height,
            chain_id: CHAIN_ID.to_string(),
        };
        let verifier = Ed25519Verifier;
        let mut ctx = Ctx::new(
            &mut self.store,
            &mut self.ledger,
            &verifier,
            &header,
            &self.config,
        );
        f(&mut ctx)
    }

    pub fn balance(&self, holder: Holder) -> u128 {
        self.ledger.balance(&holder, DENOM).unwrap()
    }
}

/// Provider terms published through ModProvider.
#[derive(Debug, Clone)]
pub struct Terms {
    pub metadata_nonce: u64,
    pub status: ProviderStatus,
    pub min_contract_duration: i64,
    pub max_contract_duration: i64,
    pub subscription_rate: u128,
    pub pay_as_you_go_rate: u128,
    pub settlement_duration: i64,
    pub pay_as_you_go_enabled: bool,
}

impl Default for Terms {
    fn default() -> Self {
        Self {
            metadata_nonce: 1,
            status: ProviderStatus::Online,
            min_contract_duration: 1,
            max_contract_duration: 1_000,
            subscription_rate: 15,
            pay_as_you_go_rate: 10,
            settlement_duration: 5,
            pay_as_you_go_enabled: true,
        }
    }
}

/// Contract parameters of an OpenContract message.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub contract_type: ContractKind,
    pub authorization: Authorization,
    pub duration: i64,
    pub settlement_duration: i64,
    pub rate: Coin,
    pub deposit: u128,
    pub delegate: Option<PubKey>,
}

impl OpenRequest {
    /// Subscription with the exact deposit `rate * duration`.
    pub fn subscription(rate: u128, duration: i64) -> Self {
        Self {
            contract_type: ContractKind::Subscription,
            authorization: Authorization::Closed,
            duration,
            settlement_duration: Terms::default().settlement_duration,
            rate: Coin::new(DENOM, rate),
            deposit: rate * duration as u128,
            delegate: None,
        }
    }

    pub fn pay_as_you_go(rate: u128, duration: i64, deposit: u128) -> Self {
        Self {
            contract_type: ContractKind::PayAsYouGo,
            authorization: Authorization::Closed,
            duration,
            settlement_duration: Terms::default().settlement_duration,
            rate: Coin::new(DENOM, rate),
            deposit,
            delegate: None,
        }
    }
}

pub fn bond(provider: &Ed25519KeyPair, amount: i128) -> SignedMsg {
    SignedMsg {
        signer: provider.address(),
        msg: Msg::BondProvider(MsgBondProvider {
            provider: provider.pubkey(),
            service: service(),
            bond: amount,
        }),
    }
}

pub fn mod_provider(provider: &Ed25519KeyPair, terms: Terms) -> SignedMsg {
    SignedMsg {
        signer: provider.address(),
        msg: Msg::ModProvider(MsgModProvider {
            provider: provider.pubkey(),
            service: service(),
            metadata_uri: "https://provider.example/meta.json".to_string(),
            metadata_nonce: terms.metadata_nonce,
            status: terms.status,
            min_contract_duration: terms.min_contract_duration,
            max_contract_duration: terms.max_contract_duration,
            subscription_rate: Coins::new(vec![Coin::new(DENOM, terms.subscription_rate)]),
            pay_as_you_go_rate: Coins::new(vec![Coin::new(DENOM, terms.pay_as_you_go_rate)]),
            settlement_duration: terms.settlement_duration,
            pay_as_you_go_enabled: terms.pay_as_you_go_enabled,
        }),
    }
}

pub fn open(provider: &Ed25519KeyPair, client: &Ed25519KeyPair, req: OpenRequest) -> SignedMsg {
    SignedMsg {
        signer: client.address(),
        msg: Msg::OpenContract(MsgOpenContract {
            provider: provider.pubkey(),
            service: service(),
            client: client.pubkey(),
            delegate: req.delegate,
            contract_type: req.contract_type,
            authorization: req.authorization,
            duration: req.duration,
            settlement_duration: req.settlement_duration,
            rate: req.rate,
            deposit: req.deposit,
            queries_per_minute: 60,
        }),
    }
}

pub fn close(client: &Ed25519KeyPair, contract_id: u64, delegate: Option<PubKey>) -> SignedMsg {
    SignedMsg {
        signer: client.address(),
        msg: Msg::CloseContract(MsgCloseContract {
            contract_id,
            client: client.pubkey(),
            delegate,
        }),
    }
}

/// A claim signed by `spender` and submitted by `submitter`.
pub fn claim(
    spender: &Ed25519KeyPair,
    submitter: AccAddress,
    contract_id: u64,
    nonce: i64,
    expires_at: BlockHeight,
) -> SignedMsg {
    claim_on_chain(spender, submitter, contract_id, nonce, expires_at, CHAIN_ID)
}

pub fn claim_on_chain(
    spender: &Ed25519KeyPair,
    submitter: AccAddress,
    contract_id: u64,
    nonce: i64,
    expires_at: BlockHeight,
    chain_id: &str,
) -> SignedMsg {
    let signature = spender
        .sign(&claim_sign_bytes(contract_id, nonce, chain_id, expires_at))
        .to_vec();
    SignedMsg {
        signer: submitter,
        msg: Msg::ClaimContractIncome(MsgClaimContractIncome {
            contract_id,
            nonce,
            chain_id: chain_id.to_string(),
            signature_expires_at_block: expires_at,
            signature,
        }),
    }
}

pub fn set_version(validator: &Ed25519KeyPair, version: i64) -> SignedMsg {
    SignedMsg {
        signer: validator.address(),
        msg: Msg::SetVersion(MsgSetVersion { version }),
    }
}

pub fn register_service(signer: &Ed25519KeyPair, id: u64, name: &str) -> SignedMsg {
    SignedMsg {
        signer: signer.address(),
        msg: Msg::RegisterService(MsgRegisterService {
            id,
            name: Service::new(name).unwrap(),
            description: format!("{name} rpc"),
            service_type: "rpc".to_string(),
        }),
    }
}

pub fn update_service(signer: &Ed25519KeyPair, id: u64, name: &str, description: &str) -> SignedMsg {
    SignedMsg {
        signer: signer.address(),
        msg: Msg::UpdateService(MsgUpdateService {
            id,
            name: Service::new(name).unwrap(),
            description: description.to_string(),
            service_type: "rpc".to_string(),
        }),
    }
}

pub fn remove_service(signer: &Ed25519KeyPair, name: &str) -> SignedMsg {
    SignedMsg {
        signer: signer.address(),
        msg: Msg::RemoveService(MsgRemoveService {
            name: Service::new(name).unwrap(),
        }),
    }
}
