//! Validator rewards and protocol upgrades across blocks.

use shared_types::{AccAddress, Coin, Holder, ModuleAccount};
use tg_contract_engine::{
    BalanceLedger, ConfigRegistry, ContractQueryApi, Delegation, EngineConfig, StaticValidatorRegistry,
    ValidatorInfo, VoteInfo,
};

use crate::fixtures::*;

fn addr(b: u8) -> AccAddress {
    AccAddress([b; 20])
}

fn validator(address: AccAddress, delegations: &[(AccAddress, u128)], commission_bps: u128) -> ValidatorInfo {
    ValidatorInfo {
        address,
        delegator_shares: delegations.iter().map(|(_, shares)| shares).sum(),
        commission_rate_bps: commission_bps,
        bonded: true,
        jailed: false,
        delegations: delegations
            .iter()
            .map(|(delegator, shares)| Delegation {
                delegator: *delegator,
                shares: *shares,
            })
            .collect(),
    }
}

fn votes(signers: &[(AccAddress, bool)]) -> Vec<VoteInfo> {
    signers
        .iter()
        .map(|(validator, signed)| VoteInfo {
            validator: *validator,
            signed_last_block: *signed,
        })
        .collect()
}

/// Two validators; the first carries a 10% commission on an outside delegator.
fn payout_chain(cycle: i64) -> Chain {
    let config = EngineConfig {
        blocks_per_year: 100,
        emission_curve: 1,
        validator_payout_cycle: cycle,
        ..test_config()
    };
    let registry = StaticValidatorRegistry::new(vec![
        validator(addr(101), &[(addr(101), 1_000), (addr(1), 2_000)], 1_000),
        validator(addr(102), &[(addr(102), 1_000)], 1_000),
    ]);
    let mut chain = Chain::with_configs(ConfigRegistry::new(config), registry);
    chain
        .engine
        .ledger_mut()
        .mint(&Holder::Module(ModuleAccount::Reserve), &Coin::new(DENOM, 1_000_000))
        .expect("mint reserve");
    chain
}

#[test]
fn test_reward_split_by_stake_and_commission() {
    let mut chain = payout_chain(1);
    chain.set_votes(votes(&[(addr(101), true), (addr(102), true)]));

    // 1_000_000 / 1 / 100 = 10_000, split 7_500 / 2_500
    let result = chain.block(Vec::new());
    let payouts = events_of(&result, "validator_payout");
    assert_eq!(payouts.len(), 2);
    assert_eq!(payouts[0].get("validator"), Some(addr(101).to_string().as_str()));
    assert_eq!(payouts[0].get("reward"), Some("500utoll"));
    assert_eq!(payouts[1].get("reward"), Some("0utoll"));

    assert_eq!(chain.balance(addr(101)), 2_500 + 500);
    assert_eq!(chain.balance(addr(1)), 4_500);
    assert_eq!(chain.balance(addr(102)), 2_500);
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::Reserve)), 990_000);
}

#[test]
fn test_absent_signer_earns_nothing() {
    let mut chain = payout_chain(1);
    chain.set_votes(votes(&[(addr(101), true), (addr(102), false)]));

    chain.block(Vec::new());
    assert_eq!(chain.balance(addr(102)), 0);
    // the whole 10_000 goes to the first validator's stake
    assert_eq!(chain.balance(addr(101)), 3_333 + 666);
    assert_eq!(chain.balance(addr(1)), 6_000);
}

#[test]
fn test_payout_only_on_cycle_heights() {
    let mut chain = payout_chain(5);
    chain.set_votes(votes(&[(addr(101), true), (addr(102), true)]));

    for _ in 1..5 {
        let result = chain.block(Vec::new());
        assert!(events_of(&result, "validator_payout").is_empty());
    }
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::Reserve)), 1_000_000);

    // 1_000_000 / 1 / (100 / 5) = 50_000
    let result = chain.block(Vec::new());
    assert_eq!(result.height, 5);
    assert_eq!(events_of(&result, "validator_payout").len(), 2);
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::Reserve)), 950_000);
}

#[test]
fn test_no_votes_no_payout() {
    let mut chain = payout_chain(1);
    let result = chain.block(Vec::new());
    assert!(events_of(&result, "validator_payout").is_empty());
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::Reserve)), 1_000_000);
}

// =============================================================================
// PROTOCOL VERSION
// =============================================================================

#[test]
fn test_upgrade_needs_validator_consensus() {
    let (a, b, c) = (key(21), key(22), key(23));
    let registry = StaticValidatorRegistry::new(vec![
        validator(a.address(), &[(a.address(), 300)], 0),
        validator(b.address(), &[(b.address(), 200)], 0),
        validator(c.address(), &[(c.address(), 100)], 0),
    ]);
    let configs = ConfigRegistry::new(test_config())
        .with_version(
            2,
            EngineConfig {
                reserve_tax_bps: 500,
                ..test_config()
            },
        )
        .expect("valid config");
    let mut chain = Chain::with_configs(configs, registry);

    let result = chain.block(vec![set_version(&a, 2)]);
    assert!(result.tx_results[0].is_ok());
    assert_eq!(result.protocol_version, 1);

    // one of three is below the 90% threshold; an outsider does not count
    let outsider = key(30);
    let result = chain.block(vec![set_version(&outsider, 2), set_version(&b, 2)]);
    assert!(result.tx_results.iter().all(|r| r.is_ok()));
    assert_eq!(result.protocol_version, 1);
    assert!(events_of(&result, "protocol_upgrade").is_empty());

    // announcements from the previous block take effect here
    let result = chain.block(Vec::new());
    assert_eq!(result.protocol_version, 2);
    let upgrade = events_of(&result, "protocol_upgrade");
    assert_eq!(upgrade.len(), 1);
    assert_eq!(upgrade[0].get("from"), Some("1"));
    assert_eq!(upgrade[0].get("to"), Some("2"));
    assert_eq!(upgrade[0].get("height"), Some("3"));
    assert_eq!(chain.engine.queries().protocol_version().unwrap(), 2);

    // the version 2 tax applies to later settlements
    let provider = key(1);
    let client = key(2);
    let btc = service("btc-mainnet");
    chain.register_provider(&provider, &btc, &ProviderTerms::default());
    chain.fund(client.address(), 10_000);
    chain
        .tx_at(5, open_contract(&client, &provider, &btc, Open::subscription(15, 10)))
        .unwrap();
    chain.tx_at(9, close_contract(&client, 1, None)).unwrap();
    assert_eq!(chain.balance(provider.address()), 57);
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::Reserve)), 3);
}

#[test]
fn test_version_announcements_only_increase() {
    let a = key(21);
    let registry = StaticValidatorRegistry::new(vec![validator(a.address(), &[(a.address(), 1)], 0)]);
    let configs = ConfigRegistry::new(test_config())
        .with_version(3, test_config())
        .expect("valid config");
    let mut chain = Chain::with_configs(configs, registry);

    chain.tx_at(1, set_version(&a, 3)).unwrap();
    let err = chain.tx_at(2, set_version(&a, 2)).unwrap_err();
    assert!(err.contains("cannot move version from 3 to 2"), "{err}");
    // a lone validator decides alone
    assert_eq!(chain.engine.queries().protocol_version().unwrap(), 3);
}
