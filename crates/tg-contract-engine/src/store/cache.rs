//! # Scratch Overlays
//!
//! Copy-on-write views over a parent store and ledger. Reads fall through to
//! the parent; writes stay local until the owner commits them with
//! [`CacheKv::into_ops`] / [`LedgerCache::into_ops`]. Dropping an overlay
//! discards everything it recorded.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::{Coin, Holder};

use crate::domain::errors::{LedgerError, StoreError};
use crate::ports::{BalanceLedger, KvOp, KvStore, LedgerOp};

// =============================================================================
// KEY/VALUE OVERLAY
// =============================================================================

/// Pending writes over a read-only parent store. `None` marks a deletion.
pub struct CacheKv<'p, P: KvStore + ?Sized> {
    parent: &'p P,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'p, P: KvStore + ?Sized> CacheKv<'p, P> {
    pub fn new(parent: &'p P) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Pending writes as a batch for the parent.
    pub fn into_ops(self) -> Vec<KvOp> {
        self.writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => KvOp::Set { key, value },
                None => KvOp::Delete { key },
            })
            .collect()
    }
}

impl<P: KvStore + ?Sized> KvStore for CacheKv<'_, P> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.scan_prefix(prefix)?.into_iter().collect();
        let pending = self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, value) in pending {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

// =============================================================================
// LEDGER OVERLAY
// =============================================================================

fn to_delta(coin: &Coin) -> Result<i128, LedgerError> {
    i128::try_from(coin.amount).map_err(|_| LedgerError::Overflow(coin.to_string()))
}

fn apply_delta(base: u128, delta: i128, what: &str) -> Result<u128, LedgerError> {
    let result = if delta >= 0 {
        base.checked_add(delta.unsigned_abs())
    } else {
        base.checked_sub(delta.unsigned_abs())
    };
    result.ok_or_else(|| LedgerError::Overflow(what.to_string()))
}

fn add_delta(slot: &mut i128, delta: i128, what: &str) -> Result<(), LedgerError> {
    *slot = slot
        .checked_add(delta)
        .ok_or_else(|| LedgerError::Overflow(what.to_string()))?;
    Ok(())
}

/// Balance deltas over a read-only parent ledger, plus the ordered list of
/// mutations to replay on commit.
pub struct LedgerCache<'p, L: BalanceLedger + ?Sized> {
    parent: &'p L,
    deltas: BTreeMap<(Holder, String), i128>,
    supply_deltas: BTreeMap<String, i128>,
    ops: Vec<LedgerOp>,
}

impl<'p, L: BalanceLedger + ?Sized> LedgerCache<'p, L> {
    pub fn new(parent: &'p L) -> Self {
        Self {
            parent,
            deltas: BTreeMap::new(),
            supply_deltas: BTreeMap::new(),
            ops: Vec::new(),
        }
    }

    /// Recorded mutations, in order.
    pub fn into_ops(self) -> Vec<LedgerOp> {
        self.ops
    }

    fn debit(&mut self, holder: &Holder, coin: &Coin) -> Result<i128, LedgerError> {
        let available = self.balance(holder, &coin.denom)?;
        if available < coin.amount {
            return Err(LedgerError::InsufficientFunds {
                holder: *holder,
                required: coin.clone(),
                available,
            });
        }
        let delta = to_delta(coin)?;
        let slot = self
            .deltas
            .entry((*holder, coin.denom.clone()))
            .or_default();
        add_delta(slot, -delta, &coin.denom)?;
        Ok(delta)
    }

    fn credit(&mut self, holder: &Holder, denom: &str, delta: i128) -> Result<(), LedgerError> {
        let slot = self.deltas.entry((*holder, denom.to_string())).or_default();
        add_delta(slot, delta, denom)
    }
}

impl<L: BalanceLedger + ?Sized> BalanceLedger for LedgerCache<'_, L> {
    fn balance(&self, holder: &Holder, denom: &str) -> Result<u128, LedgerError> {
        let base = self.parent.balance(holder, denom)?;
        let delta = self
            .deltas
            .get(&(*holder, denom.to_string()))
            .copied()
            .unwrap_or(0);
        apply_delta(base, delta, denom)
    }

    fn supply(&self, denom: &str) -> Result<u128, LedgerError> {
        let base = self.parent.supply(denom)?;
        let delta = self.supply_deltas.get(denom).copied().unwrap_or(0);
        apply_delta(base, delta, denom)
    }

    fn denoms(&self, holder: &Holder) -> Result<Vec<String>, LedgerError> {
        let mut candidates: BTreeSet<String> = self.parent.denoms(holder)?.into_iter().collect();
        candidates.extend(
            self.deltas
                .keys()
                .filter(|(h, _)| h == holder)
                .map(|(_, denom)| denom.clone()),
        );
        let mut out = Vec::with_capacity(candidates.len());
        for denom in candidates {
            if self.balance(holder, &denom)? > 0 {
                out.push(denom);
            }
        }
        Ok(out)
    }

    fn transfer(&mut self, from: &Holder, to: &Holder, coin: &Coin) -> Result<(), LedgerError> {
        let delta = self.debit(from, coin)?;
        self.credit(to, &coin.denom, delta)?;
        self.ops.push(LedgerOp::Transfer {
            from: *from,
            to: *to,
            coin: coin.clone(),
        });
        Ok(())
    }

    fn mint(&mut self, to: &Holder, coin: &Coin) -> Result<(), LedgerError> {
        let delta = to_delta(coin)?;
        self.credit(to, &coin.denom, delta)?;
        let supply = self.supply_deltas.entry(coin.denom.clone()).or_default();
        add_delta(supply, delta, &coin.denom)?;
        self.ops.push(LedgerOp::Mint {
            to: *to,
            coin: coin.clone(),
        });
        Ok(())
    }

    fn burn(&mut self, from: &Holder, coin: &Coin) -> Result<(), LedgerError> {
        let delta = self.debit(from, coin)?;
        let supply = self.supply_deltas.entry(coin.denom.clone()).or_default();
        add_delta(supply, -delta, &coin.denom)?;
        self.ops.push(LedgerOp::Burn {
            from: *from,
            coin: coin.clone(),
        });
        Ok(())
    }
}
