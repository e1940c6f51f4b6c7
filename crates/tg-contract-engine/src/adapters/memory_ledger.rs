//! In-memory balance ledger for tests and the dev runtime.

use std::collections::BTreeMap;

use shared_types::{Coin, Holder};

use crate::domain::errors::LedgerError;
use crate::ports::BalanceLedger;

/// Balances keyed by `(holder, denom)` with per-denomination supply.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: BTreeMap<(Holder, String), u128>,
    supply: BTreeMap<String, u128>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, holder: &Holder, denom: &str) -> u128 {
        self.balances
            .get(&(*holder, denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn store(&mut self, holder: &Holder, denom: &str, amount: u128) {
        let key = (*holder, denom.to_string());
        if amount == 0 {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, amount);
        }
    }

    fn require(&self, holder: &Holder, coin: &Coin) -> Result<u128, LedgerError> {
        let available = self.slot(holder, &coin.denom);
        if available < coin.amount {
            return Err(LedgerError::InsufficientFunds {
                holder: *holder,
                required: coin.clone(),
                available,
            });
        }
        Ok(available)
    }
}

impl BalanceLedger for InMemoryLedger {
    fn balance(&self, holder: &Holder, denom: &str) -> Result<u128, LedgerError> {
        Ok(self.slot(holder, denom))
    }

    fn supply(&self, denom: &str) -> Result<u128, LedgerError> {
        Ok(self.supply.get(denom).copied().unwrap_or(0))
    }

    fn denoms(&self, holder: &Holder) -> Result<Vec<String>, LedgerError> {
        Ok(self
            .balances
            .keys()
            .filter(|(h, _)| h == holder)
            .map(|(_, denom)| denom.clone())
            .collect())
    }

    fn transfer(&mut self, from: &Holder, to: &Holder, coin: &Coin) -> Result<(), LedgerError> {
        let source = self.require(from, coin)?;
        if from == to {
            return Ok(());
        }
        let dest = self
            .slot(to, &coin.denom)
            .checked_add(coin.amount)
            .ok_or_else(|| LedgerError::Overflow(coin.to_string()))?;
        self.store(from, &coin.denom, source - coin.amount);
        self.store(to, &coin.denom, dest);
        Ok(())
    }

    fn mint(&mut self, to: &Holder, coin: &Coin) -> Result<(), LedgerError> {
        let overflow = || LedgerError::Overflow(coin.to_string());
        let supply = self
            .supply(&coin.denom)?
            .checked_add(coin.amount)
            .ok_or_else(overflow)?;
        let balance = self
            .slot(to, &coin.denom)
            .checked_add(coin.amount)
            .ok_or_else(overflow)?;
        self.supply.insert(coin.denom.clone(), supply);
        self.store(to, &coin.denom, balance);
        Ok(())
    }

    fn burn(&mut self, from: &Holder, coin: &Coin) -> Result<(), LedgerError> {
        let balance = self.require(from, coin)?;
        let supply = self.supply(&coin.denom)?.saturating_sub(coin.amount);
        self.supply.insert(coin.denom.clone(), supply);
        self.store(from, &coin.denom, balance - coin.amount);
        Ok(())
    }
}
