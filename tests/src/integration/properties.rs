//! Model-checked message sequences.

use proptest::prelude::*;
use shared_types::{Holder, ModuleAccount};

use crate::fixtures::*;

fn pool(module: ModuleAccount) -> Holder {
    Holder::Module(module)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The provider record exists iff its bond is positive, and the bond
    /// pool always holds exactly the recorded bond.
    #[test]
    fn prop_bond_record_tracks_pool(deltas in prop::collection::vec(-1_500i128..1_500, 1..20)) {
        let mut chain = Chain::new();
        let provider = key(1);
        let btc = service("btc-mainnet");
        chain.fund(provider.address(), 1_000_000);

        let mut expected: u128 = 0;
        for delta in deltas {
            let height = chain.height() + 1;
            let accepted = chain.tx_at(height, bond_provider(&provider, &btc, delta)).is_ok();
            let allowed = delta > 0 || (delta < 0 && delta.unsigned_abs() <= expected);
            prop_assert_eq!(accepted, allowed, "delta {}", delta);
            if allowed {
                expected = if delta > 0 {
                    expected + delta.unsigned_abs()
                } else {
                    expected - delta.unsigned_abs()
                };
            }

            let stored = chain.provider(&provider, &btc);
            prop_assert_eq!(stored.as_ref().map(|p| p.bond), (expected > 0).then_some(expected));
            prop_assert_eq!(chain.balance(pool(ModuleAccount::ProviderBond)), expected);
            prop_assert_eq!(chain.balance(provider.address()), 1_000_000 - expected);
        }
    }

    /// Pay-as-you-go claims only move forward: `paid = min(deposit, rate * nonce)`
    /// for the highest accepted nonce, and no token leaves the three parties.
    #[test]
    fn prop_claims_are_monotonic(
        rate in 1u128..50,
        deposit in 1u128..5_000,
        nonces in prop::collection::vec(1i64..300, 1..15),
    ) {
        let mut chain = Chain::new();
        let provider = key(1);
        let client = key(2);
        let btc = service("btc-mainnet");
        let terms = ProviderTerms {
            pay_as_you_go_rate: rate,
            ..ProviderTerms::default()
        };
        chain.register_provider(&provider, &btc, &terms);
        chain.fund(client.address(), deposit);
        let opened = chain.tx_at(
            2,
            open_contract(&client, &provider, &btc, Open::pay_as_you_go(rate, 1_000, deposit)),
        );
        prop_assert!(opened.is_ok(), "{:?}", opened);

        let mut stored_nonce = 0i64;
        let mut paid = 0u128;
        for nonce in nonces {
            let height = chain.height() + 1;
            let accepted = chain
                .tx_at(height, claim(&client, provider.address(), 1, nonce, height))
                .is_ok();
            let allowed = nonce > stored_nonce && paid < deposit;
            prop_assert_eq!(accepted, allowed, "nonce {} after {}", nonce, stored_nonce);
            if allowed {
                stored_nonce = nonce;
            }

            let contract = chain.contract(1);
            prop_assert!(contract.paid >= paid);
            paid = contract.paid;
            prop_assert_eq!(contract.nonce, stored_nonce);
            prop_assert_eq!(paid, deposit.min(rate * stored_nonce as u128));

            let escrow = chain.balance(pool(ModuleAccount::ContractEscrow));
            let reserve = chain.balance(pool(ModuleAccount::Reserve));
            let provider_income = chain.balance(provider.address());
            prop_assert_eq!(escrow, deposit - paid);
            prop_assert_eq!(provider_income + reserve, paid);
        }
    }
}
