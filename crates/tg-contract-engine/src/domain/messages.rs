//! # Inbound Messages
//!
//! Each message is bound to the address that signed its transaction. Before
//! any state is read, [`SignedMsg::validate_basic`] runs the stateless checks.

use serde::{Deserialize, Serialize};
use shared_crypto::derive_address;
use shared_types::{AccAddress, BlockHeight, Coin, Coins, PubKey, Service};

use crate::domain::config::EngineConfig;
use crate::domain::entities::{Authorization, ContractKind, ProviderStatus, ServiceRecord, MAX_SERVICE_ID};
use crate::domain::errors::EngineError;

/// Post, top up or withdraw provider bond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBondProvider {
    pub provider: PubKey,
    pub service: Service,
    /// Positive bonds, negative withdraws.
    pub bond: i128,
}

/// Replace a provider's published terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgModProvider {
    pub provider: PubKey,
    pub service: Service,
    pub metadata_uri: String,
    pub metadata_nonce: u64,
    pub status: ProviderStatus,
    pub min_contract_duration: i64,
    pub max_contract_duration: i64,
    pub subscription_rate: Coins,
    pub pay_as_you_go_rate: Coins,
    pub settlement_duration: i64,
    pub pay_as_you_go_enabled: bool,
}

/// Open a contract against a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgOpenContract {
    pub provider: PubKey,
    pub service: Service,
    pub client: PubKey,
    #[serde(default)]
    pub delegate: Option<PubKey>,
    pub contract_type: ContractKind,
    pub authorization: Authorization,
    pub duration: i64,
    pub settlement_duration: i64,
    pub rate: Coin,
    pub deposit: u128,
    pub queries_per_minute: u64,
}

/// Close a contract early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCloseContract {
    pub contract_id: u64,
    pub client: PubKey,
    #[serde(default)]
    pub delegate: Option<PubKey>,
}

/// Claim accrued income with a spender-signed usage nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgClaimContractIncome {
    pub contract_id: u64,
    pub nonce: i64,
    pub chain_id: String,
    pub signature_expires_at_block: BlockHeight,
    #[serde(with = "hex_bytes", default)]
    pub signature: Vec<u8>,
}

impl MsgClaimContractIncome {
    /// Bytes the spender signs.
    pub fn sign_bytes(&self) -> Vec<u8> {
        claim_sign_bytes(
            self.contract_id,
            self.nonce,
            &self.chain_id,
            self.signature_expires_at_block,
        )
    }
}

/// Announce the software version a validator runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSetVersion {
    pub version: i64,
}

/// Add a service to the registry. Authority only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRegisterService {
    pub id: u64,
    pub name: Service,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_type: String,
}

/// Replace the description and type of a registered service. Authority only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateService {
    pub id: u64,
    pub name: Service,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_type: String,
}

/// Drop a service from the registry. Authority only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRemoveService {
    pub name: Service,
}

impl From<&MsgRegisterService> for ServiceRecord {
    fn from(msg: &MsgRegisterService) -> Self {
        Self {
            id: msg.id,
            name: msg.name.clone(),
            description: msg.description.clone(),
            service_type: msg.service_type.clone(),
        }
    }
}

impl From<&MsgUpdateService> for ServiceRecord {
    fn from(msg: &MsgUpdateService) -> Self {
        Self {
            id: msg.id,
            name: msg.name.clone(),
            description: msg.description.clone(),
            service_type: msg.service_type.clone(),
        }
    }
}

/// Every message the engine accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Msg {
    BondProvider(MsgBondProvider),
    ModProvider(MsgModProvider),
    OpenContract(MsgOpenContract),
    CloseContract(MsgCloseContract),
    ClaimContractIncome(MsgClaimContractIncome),
    SetVersion(MsgSetVersion),
    RegisterService(MsgRegisterService),
    UpdateService(MsgUpdateService),
    RemoveService(MsgRemoveService),
}

impl Msg {
    pub fn type_name(&self) -> &'static str {
        match self {
            Msg::BondProvider(_) => "bond_provider",
            Msg::ModProvider(_) => "mod_provider",
            Msg::OpenContract(_) => "open_contract",
            Msg::CloseContract(_) => "close_contract",
            Msg::ClaimContractIncome(_) => "claim_contract_income",
            Msg::SetVersion(_) => "set_version",
            Msg::RegisterService(_) => "register_service",
            Msg::UpdateService(_) => "update_service",
            Msg::RemoveService(_) => "remove_service",
        }
    }
}

/// A message with the address that signed its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMsg {
    pub signer: AccAddress,
    pub msg: Msg,
}

/// Canonical claim bytes: `"{contract_id}:{nonce}:{chain_id}:{expires_at}"`.
pub fn claim_sign_bytes(
    contract_id: u64,
    nonce: i64,
    chain_id: &str,
    expires_at: BlockHeight,
) -> Vec<u8> {
    format!("{contract_id}:{nonce}:{chain_id}:{expires_at}").into_bytes()
}

fn require_signer(signer: &AccAddress, key: &PubKey) -> Result<(), EngineError> {
    let expected = derive_address(key);
    if *signer != expected {
        return Err(EngineError::SignerMismatch {
            signer: *signer,
            expected,
        });
    }
    Ok(())
}

fn require_service_id(id: u64) -> Result<(), EngineError> {
    if id == 0 || id > MAX_SERVICE_ID {
        return Err(EngineError::InvalidServiceId(id));
    }
    Ok(())
}

fn require_rates(rates: &Coins, label: &str) -> Result<(), EngineError> {
    rates
        .validate()
        .map_err(|e| EngineError::InvalidRate(format!("{label}: {e}")))
}

impl SignedMsg {
    /// Stateless checks that need nothing but the message and the config.
    pub fn validate_basic(&self, config: &EngineConfig) -> Result<(), EngineError> {
        match &self.msg {
            Msg::BondProvider(msg) => {
                require_signer(&self.signer, &msg.provider)?;
                if msg.bond == 0 {
                    return Err(EngineError::InvalidBond);
                }
            }
            Msg::ModProvider(msg) => {
                require_signer(&self.signer, &msg.provider)?;
                if msg.metadata_uri.len() > config.max_metadata_uri_len {
                    return Err(EngineError::InvalidMetadataUri {
                        len: msg.metadata_uri.len(),
                        max: config.max_metadata_uri_len,
                    });
                }
                if msg.min_contract_duration <= 0 {
                    return Err(EngineError::InvalidDuration(
                        "min contract duration must be positive".into(),
                    ));
                }
                if msg.min_contract_duration > msg.max_contract_duration {
                    return Err(EngineError::InvalidDuration(format!(
                        "min contract duration {} above max {}",
                        msg.min_contract_duration, msg.max_contract_duration
                    )));
                }
                if msg.settlement_duration < 0 {
                    return Err(EngineError::InvalidDuration(
                        "settlement duration cannot be negative".into(),
                    ));
                }
                require_rates(&msg.subscription_rate, "subscription")?;
                require_rates(&msg.pay_as_you_go_rate, "pay-as-you-go")?;
            }
            Msg::OpenContract(msg) => {
                require_signer(&self.signer, &msg.client)?;
                if msg.duration <= 0 {
                    return Err(EngineError::InvalidDuration(
                        "contract duration must be positive".into(),
                    ));
                }
                if msg.settlement_duration < 0 {
                    return Err(EngineError::InvalidDuration(
                        "settlement duration cannot be negative".into(),
                    ));
                }
                msg.rate.validate()?;
                if msg.rate.is_zero() {
                    return Err(EngineError::InvalidRate("contract rate must be positive".into()));
                }
                if msg.deposit == 0 {
                    return Err(EngineError::InvalidDeposit);
                }
            }
            Msg::CloseContract(_) => {}
            Msg::ClaimContractIncome(msg) => {
                if msg.nonce <= 0 {
                    return Err(EngineError::InvalidNonce);
                }
                if msg.chain_id.is_empty() {
                    return Err(EngineError::InvalidChainId);
                }
                if msg.signature_expires_at_block <= 0 {
                    return Err(EngineError::InvalidSignatureExpiry(
                        msg.signature_expires_at_block,
                    ));
                }
                if msg.signature.len() > config.max_signature_len {
                    return Err(EngineError::SignatureTooLong {
                        len: msg.signature.len(),
                        max: config.max_signature_len,
                    });
                }
            }
            Msg::SetVersion(msg) => {
                if msg.version <= 0 {
                    return Err(EngineError::InvalidVersion(msg.version));
                }
            }
            Msg::RegisterService(msg) => require_service_id(msg.id)?,
            Msg::UpdateService(msg) => require_service_id(msg.id)?,
            Msg::RemoveService(_) => {}
        }
        Ok(())
    }
}

/// Hex in text formats, raw bytes in binary formats.
mod hex_bytes {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            hex::decode(text).map_err(D::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}
