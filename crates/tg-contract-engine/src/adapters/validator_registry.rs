//! Static validator set, supplied by the host at start-up.

use std::collections::BTreeSet;

use shared_types::AccAddress;

use crate::domain::entities::{ValidatorInfo, VoteInfo};
use crate::domain::errors::RegistryError;
use crate::ports::ValidatorRegistry;

/// A fixed list of validators, kept in power order.
#[derive(Debug, Clone, Default)]
pub struct StaticValidatorRegistry {
    validators: Vec<ValidatorInfo>,
}

impl StaticValidatorRegistry {
    pub fn new(validators: Vec<ValidatorInfo>) -> Self {
        let mut registry = Self { validators };
        registry.sort();
        registry
    }

    /// Insert or replace a validator by address.
    pub fn upsert(&mut self, validator: ValidatorInfo) {
        match self
            .validators
            .iter_mut()
            .find(|v| v.address == validator.address)
        {
            Some(slot) => *slot = validator,
            None => self.validators.push(validator),
        }
        self.sort();
    }

    pub fn get(&self, address: &AccAddress) -> Option<&ValidatorInfo> {
        self.validators.iter().find(|v| v.address == *address)
    }

    fn sort(&mut self) {
        self.validators.sort_by(|a, b| {
            b.delegator_shares
                .cmp(&a.delegator_shares)
                .then_with(|| a.address.cmp(&b.address))
        });
    }
}

impl ValidatorRegistry for StaticValidatorRegistry {
    fn bonded_signing_validators(
        &self,
        votes: &[VoteInfo],
    ) -> Result<Vec<ValidatorInfo>, RegistryError> {
        let signers: BTreeSet<AccAddress> = votes
            .iter()
            .filter(|vote| vote.signed_last_block)
            .map(|vote| vote.validator)
            .collect();
        Ok(self
            .validators
            .iter()
            .filter(|v| v.bonded && signers.contains(&v.address))
            .cloned()
            .collect())
    }

    fn bonded_validators(&self) -> Result<Vec<ValidatorInfo>, RegistryError> {
        Ok(self.validators.iter().filter(|v| v.bonded).cloned().collect())
    }
}
