//! # Typed Tables
//!
//! One namespace prefix per entity over any [`KvStore`]:
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `svc/` | `name` | `ServiceRecord` |
//! | `svcid/` | `id` | service name |
//! | `p/` | `pubkey / service` | `Provider` |
//! | `c/` | `id` | `Contract` |
//! | `cni/` | - | next contract id |
//! | `ces/` | `height / id` | - (expiration bucket) |
//! | `ucs/` | `spender / id` | - (active-contract index) |
//! | `ver/` | - | protocol version |
//! | `verv/` | `address` | announced validator version |
//! | `lbh/` | - | height of the last committed block |
//!
//! Values are bincode. Numeric key parts are big-endian so prefix scans come
//! back in numeric order. Only the two index tables (and the invariant and
//! query paths) use prefix iteration.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{AccAddress, BlockHeight, PubKey, Service};

use crate::domain::entities::{Contract, Provider, ServiceRecord};
use crate::domain::errors::StoreError;
use crate::ports::KvStore;

const SERVICE_PREFIX: &[u8] = b"svc/";
const SERVICE_ID_PREFIX: &[u8] = b"svcid/";
const PROVIDER_PREFIX: &[u8] = b"p/";
const CONTRACT_PREFIX: &[u8] = b"c/";
const NEXT_CONTRACT_ID_KEY: &[u8] = b"cni/";
const EXPIRATION_PREFIX: &[u8] = b"ces/";
const USER_CONTRACT_PREFIX: &[u8] = b"ucs/";
const VERSION_KEY: &[u8] = b"ver/";
const VALIDATOR_VERSION_PREFIX: &[u8] = b"verv/";
const LAST_HEIGHT_KEY: &[u8] = b"lbh/";

/// First id handed out by [`allocate_contract_id`].
pub const FIRST_CONTRACT_ID: u64 = 1;

// =============================================================================
// KEYS
// =============================================================================

fn join(parts: &[&[u8]]) -> Vec<u8> {
    let mut key = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Order-preserving encoding of a signed height.
fn height_bytes(height: BlockHeight) -> [u8; 8] {
    ((height as u64) ^ (1 << 63)).to_be_bytes()
}

fn service_key(name: &Service) -> Vec<u8> {
    join(&[SERVICE_PREFIX, name.as_str().as_bytes()])
}

fn service_id_key(id: u64) -> Vec<u8> {
    join(&[SERVICE_ID_PREFIX, &id.to_be_bytes()])
}

fn provider_key(pubkey: &PubKey, service: &Service) -> Vec<u8> {
    join(&[PROVIDER_PREFIX, pubkey.as_bytes(), b"/", service.as_str().as_bytes()])
}

fn contract_key(id: u64) -> Vec<u8> {
    join(&[CONTRACT_PREFIX, &id.to_be_bytes()])
}

fn expiration_prefix(height: BlockHeight) -> Vec<u8> {
    join(&[EXPIRATION_PREFIX, &height_bytes(height), b"/"])
}

fn expiration_key(height: BlockHeight, id: u64) -> Vec<u8> {
    join(&[&expiration_prefix(height), &id.to_be_bytes()])
}

fn user_prefix(spender: &PubKey) -> Vec<u8> {
    join(&[USER_CONTRACT_PREFIX, spender.as_bytes(), b"/"])
}

fn user_key(spender: &PubKey, id: u64) -> Vec<u8> {
    join(&[&user_prefix(spender), &id.to_be_bytes()])
}

fn validator_version_key(address: &AccAddress) -> Vec<u8> {
    join(&[VALIDATOR_VERSION_PREFIX, address.as_bytes()])
}

fn id_suffix(key: &[u8]) -> Result<u64, StoreError> {
    let start = key
        .len()
        .checked_sub(8)
        .ok_or_else(|| StoreError::Codec(format!("index key too short: {}", key.len())))?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&key[start..]);
    Ok(u64::from_be_bytes(raw))
}

// =============================================================================
// CODEC
// =============================================================================

fn read<K, T>(store: &K, key: &[u8]) -> Result<Option<T>, StoreError>
where
    K: KvStore + ?Sized,
    T: DeserializeOwned,
{
    store
        .get(key)?
        .map(|bytes| bincode::deserialize(&bytes).map_err(StoreError::from))
        .transpose()
}

fn write<K, T>(store: &mut K, key: &[u8], value: &T) -> Result<(), StoreError>
where
    K: KvStore + ?Sized,
    T: Serialize,
{
    let bytes = bincode::serialize(value)?;
    store.set(key, bytes)
}

fn scan_values<K, T>(store: &K, prefix: &[u8]) -> Result<Vec<T>, StoreError>
where
    K: KvStore + ?Sized,
    T: DeserializeOwned,
{
    store
        .scan_prefix(prefix)?
        .into_iter()
        .map(|(_, bytes)| bincode::deserialize(&bytes).map_err(StoreError::from))
        .collect()
}

fn scan_ids<K: KvStore + ?Sized>(store: &K, prefix: &[u8]) -> Result<Vec<u64>, StoreError> {
    store
        .scan_prefix(prefix)?
        .into_iter()
        .map(|(key, _)| id_suffix(&key))
        .collect()
}

// =============================================================================
// SERVICES
// =============================================================================

pub fn get_service<K: KvStore + ?Sized>(store: &K, name: &Service) -> Result<Option<ServiceRecord>, StoreError> {
    read(store, &service_key(name))
}

pub fn get_service_by_id<K: KvStore + ?Sized>(store: &K, id: u64) -> Result<Option<ServiceRecord>, StoreError> {
    match read::<_, Service>(store, &service_id_key(id))? {
        Some(name) => get_service(store, &name),
        None => Ok(None),
    }
}

/// Write the record and its id index entry.
pub fn set_service<K: KvStore + ?Sized>(store: &mut K, service: &ServiceRecord) -> Result<(), StoreError> {
    write(store, &service_key(&service.name), service)?;
    write(store, &service_id_key(service.id), &service.name)
}

/// Delete the record and its id index entry.
pub fn remove_service<K: KvStore + ?Sized>(store: &mut K, name: &Service) -> Result<(), StoreError> {
    if let Some(existing) = get_service(store, name)? {
        store.delete(&service_id_key(existing.id))?;
    }
    store.delete(&service_key(name))
}

pub fn services<K: KvStore + ?Sized>(store: &K) -> Result<Vec<ServiceRecord>, StoreError> {
    scan_values(store, SERVICE_PREFIX)
}

// =============================================================================
// PROVIDERS
// =============================================================================

pub fn get_provider<K: KvStore + ?Sized>(
    store: &K,
    pubkey: &PubKey,
    service: &Service,
) -> Result<Option<Provider>, StoreError> {
    read(store, &provider_key(pubkey, service))
}

pub fn set_provider<K: KvStore + ?Sized>(store: &mut K, provider: &Provider) -> Result<(), StoreError> {
    write(store, &provider_key(&provider.pubkey, &provider.service), provider)
}

pub fn remove_provider<K: KvStore + ?Sized>(
    store: &mut K,
    pubkey: &PubKey,
    service: &Service,
) -> Result<(), StoreError> {
    store.delete(&provider_key(pubkey, service))
}

pub fn providers<K: KvStore + ?Sized>(store: &K) -> Result<Vec<Provider>, StoreError> {
    scan_values(store, PROVIDER_PREFIX)
}

// =============================================================================
// CONTRACTS
// =============================================================================

pub fn get_contract<K: KvStore + ?Sized>(store: &K, id: u64) -> Result<Option<Contract>, StoreError> {
    read(store, &contract_key(id))
}

pub fn set_contract<K: KvStore + ?Sized>(store: &mut K, contract: &Contract) -> Result<(), StoreError> {
    write(store, &contract_key(contract.id), contract)
}

pub fn contracts<K: KvStore + ?Sized>(store: &K) -> Result<Vec<Contract>, StoreError> {
    scan_values(store, CONTRACT_PREFIX)
}

pub fn next_contract_id<K: KvStore + ?Sized>(store: &K) -> Result<u64, StoreError> {
    Ok(read(store, NEXT_CONTRACT_ID_KEY)?.unwrap_or(FIRST_CONTRACT_ID))
}

/// Hand out the next id and advance the counter.
pub fn allocate_contract_id<K: KvStore + ?Sized>(store: &mut K) -> Result<u64, StoreError> {
    let id = next_contract_id(store)?;
    let next = id
        .checked_add(1)
        .ok_or_else(|| StoreError::Codec("contract id space exhausted".to_string()))?;
    write(store, NEXT_CONTRACT_ID_KEY, &next)?;
    Ok(id)
}

// =============================================================================
// EXPIRATION BUCKETS
// =============================================================================

pub fn add_to_expiration<K: KvStore + ?Sized>(
    store: &mut K,
    height: BlockHeight,
    id: u64,
) -> Result<(), StoreError> {
    store.set(&expiration_key(height, id), Vec::new())
}

pub fn remove_from_expiration<K: KvStore + ?Sized>(
    store: &mut K,
    height: BlockHeight,
    id: u64,
) -> Result<(), StoreError> {
    store.delete(&expiration_key(height, id))
}

pub fn expiration_ids<K: KvStore + ?Sized>(store: &K, height: BlockHeight) -> Result<Vec<u64>, StoreError> {
    scan_ids(store, &expiration_prefix(height))
}

/// Drop every entry of the bucket at `height`.
pub fn clear_expiration<K: KvStore + ?Sized>(store: &mut K, height: BlockHeight) -> Result<(), StoreError> {
    for id in expiration_ids(store, height)? {
        remove_from_expiration(store, height, id)?;
    }
    Ok(())
}

// =============================================================================
// ACTIVE-CONTRACT INDEX
// =============================================================================

pub fn add_user_contract<K: KvStore + ?Sized>(
    store: &mut K,
    spender: &PubKey,
    id: u64,
) -> Result<(), StoreError> {
    store.set(&user_key(spender, id), Vec::new())
}

pub fn remove_user_contract<K: KvStore + ?Sized>(
    store: &mut K,
    spender: &PubKey,
    id: u64,
) -> Result<(), StoreError> {
    store.delete(&user_key(spender, id))
}

pub fn user_contract_ids<K: KvStore + ?Sized>(store: &K, spender: &PubKey) -> Result<Vec<u64>, StoreError> {
    scan_ids(store, &user_prefix(spender))
}

// =============================================================================
// VERSIONS
// =============================================================================

pub fn get_version<K: KvStore + ?Sized>(store: &K) -> Result<i64, StoreError> {
    Ok(read(store, VERSION_KEY)?.unwrap_or(0))
}

pub fn set_version<K: KvStore + ?Sized>(store: &mut K, version: i64) -> Result<(), StoreError> {
    write(store, VERSION_KEY, &version)
}

pub fn get_validator_version<K: KvStore + ?Sized>(
    store: &K,
    address: &AccAddress,
) -> Result<i64, StoreError> {
    Ok(read(store, &validator_version_key(address))?.unwrap_or(0))
}

pub fn set_validator_version<K: KvStore + ?Sized>(
    store: &mut K,
    address: &AccAddress,
    version: i64,
) -> Result<(), StoreError> {
    write(store, &validator_version_key(address), &version)
}

// =============================================================================
// BLOCK HEIGHT
// =============================================================================

/// Height of the last committed block; zero before the first one.
pub fn get_last_height<K: KvStore + ?Sized>(store: &K) -> Result<BlockHeight, StoreError> {
    Ok(read(store, LAST_HEIGHT_KEY)?.unwrap_or(0))
}

pub fn set_last_height<K: KvStore + ?Sized>(store: &mut K, height: BlockHeight) -> Result<(), StoreError> {
    write(store, LAST_HEIGHT_KEY, &height)
}
