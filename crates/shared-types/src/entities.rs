//! # Core Ledger Entities
//!
//! ## Clusters
//!
//! - **Identity**: `PubKey`, `AccAddress`
//! - **Value**: `Coin`, `Coins`
//! - **Custody**: `ModuleAccount`, `Holder`
//! - **Marketplace**: `Service`, `BlockHeight`

use std::fmt;
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::TypeError;

/// Block height as supplied by the surrounding block context.
pub type BlockHeight = i64;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

struct RawBytesVisitor;

impl<'de> Visitor<'de> for RawBytesVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a byte string")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(v.to_vec())
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element()? {
            out.push(byte);
        }
        Ok(out)
    }
}

/// Fixed-width byte identity rendered as hex in text formats and as raw bytes
/// in binary formats.
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width in bytes.
            pub const LEN: usize = $len;

            /// Build from a slice of exactly `LEN` bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(Self(arr))
            }

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Lowercase hex without prefix.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
                Self::from_slice(&bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let text = String::deserialize(deserializer)?;
                    text.parse().map_err(de::Error::custom)
                } else {
                    let bytes = deserializer.deserialize_bytes(RawBytesVisitor)?;
                    Self::from_slice(&bytes).map_err(de::Error::custom)
                }
            }
        }
    };
}

fixed_bytes!(
    /// A 32-byte Ed25519 public key.
    PubKey,
    32
);

fixed_bytes!(
    /// A 20-byte account address, the first 20 bytes of `sha256(pubkey)`.
    AccAddress,
    20
);

// =============================================================================
// CLUSTER B: VALUE
// =============================================================================

fn validate_denom(denom: &str) -> Result<(), TypeError> {
    let mut chars = denom.chars();
    let valid_head = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let valid_tail = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '/');
    if valid_head && valid_tail && denom.len() <= 128 {
        Ok(())
    } else {
        Err(TypeError::InvalidDenom(denom.to_string()))
    }
}

/// An amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination, e.g. `utoll`.
    pub denom: String,
    /// Amount in the smallest unit.
    pub amount: u128,
}

impl Coin {
    /// Create a coin.
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Check the denomination is well formed.
    pub fn validate(&self) -> Result<(), TypeError> {
        validate_denom(&self.denom)
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = TypeError;

    /// Parse `<amount><denom>`, e.g. `1500utoll`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| TypeError::InvalidCoin(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        let amount = amount
            .parse::<u128>()
            .map_err(|_| TypeError::InvalidCoin(s.to_string()))?;
        validate_denom(denom)?;
        Ok(Coin::new(denom, amount))
    }
}

/// An ordered list of coins with unique denominations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Wrap a list of coins. Use [`Coins::validate`] before trusting it.
    pub fn new(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    /// Amount held for `denom`, zero if absent.
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map_or(0, |c| c.amount)
    }

    /// Whether the list carries exactly this coin (same denom and amount).
    pub fn contains(&self, coin: &Coin) -> bool {
        self.0.iter().any(|c| c == coin)
    }

    /// Iterate the coins.
    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Denominations must be valid and unique; amounts must be positive.
    pub fn validate(&self) -> Result<(), TypeError> {
        for (i, coin) in self.0.iter().enumerate() {
            coin.validate()?;
            if coin.is_zero() {
                return Err(TypeError::InvalidCoin(coin.to_string()));
            }
            if self.0[..i].iter().any(|c| c.denom == coin.denom) {
                return Err(TypeError::InvalidDenom(coin.denom.clone()));
            }
        }
        Ok(())
    }
}

impl From<Vec<Coin>> for Coins {
    fn from(coins: Vec<Coin>) -> Self {
        Self(coins)
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Coin::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for Coins {
    type Err = TypeError;

    /// Parse a comma separated list, e.g. `10utoll,5uatom`. Empty input is an
    /// empty list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Coins::default());
        }
        let coins = s
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<Coin>, _>>()?;
        let coins = Coins(coins);
        coins.validate()?;
        Ok(coins)
    }
}

// =============================================================================
// CLUSTER C: CUSTODY
// =============================================================================

/// Named module pools that custody tokens on behalf of the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleAccount {
    /// Receives reserve tax and open fees; funds validator rewards.
    Reserve,
    /// Holds provider bonds.
    ProviderBond,
    /// Holds contract deposits until they are paid out or refunded.
    ContractEscrow,
}

impl ModuleAccount {
    /// Stable pool name.
    pub fn name(&self) -> &'static str {
        match self {
            ModuleAccount::Reserve => "reserve",
            ModuleAccount::ProviderBond => "providers",
            ModuleAccount::ContractEscrow => "contracts",
        }
    }
}

impl fmt::Display for ModuleAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Either side of a ledger transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    /// A module pool.
    Module(ModuleAccount),
    /// A user account.
    Account(AccAddress),
}

impl From<ModuleAccount> for Holder {
    fn from(module: ModuleAccount) -> Self {
        Holder::Module(module)
    }
}

impl From<AccAddress> for Holder {
    fn from(address: AccAddress) -> Self {
        Holder::Account(address)
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Holder::Module(m) => write!(f, "module:{m}"),
            Holder::Account(a) => write!(f, "account:{a}"),
        }
    }
}

// =============================================================================
// CLUSTER D: MARKETPLACE
// =============================================================================

/// Maximum service name length in bytes.
pub const MAX_SERVICE_LEN: usize = 64;

/// Name of an off-chain service a provider sells access to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Service(String);

impl Service {
    /// Validate and wrap a service name (`[a-z0-9_-]`, 1..=64 bytes).
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= MAX_SERVICE_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if valid {
            Ok(Self(name))
        } else {
            Err(TypeError::InvalidService(name))
        }
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Service {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Service::new(value)
    }
}

impl From<Service> for String {
    fn from(service: Service) -> Self {
        service.0
    }
}

impl FromStr for Service {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::new(s)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
