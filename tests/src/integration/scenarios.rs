//! Provider and contract lifecycles, one block per step.

use shared_crypto::Ed25519KeyPair;
use shared_types::{Holder, ModuleAccount};
use tg_contract_engine::{ContractQueryApi, EngineConfig, Msg, ProviderStatus, SignedMsg};

use crate::fixtures::*;

fn parties() -> (Chain, Ed25519KeyPair, Ed25519KeyPair) {
    let mut chain = Chain::new();
    let provider = key(1);
    let client = key(2);
    chain.register_provider(&provider, &service("btc-mainnet"), &ProviderTerms::default());
    (chain, provider, client)
}

fn reserve() -> Holder {
    Holder::Module(ModuleAccount::Reserve)
}

// =============================================================================
// PAY-AS-YOU-GO
// =============================================================================

#[test]
fn test_pay_as_you_go_claims_clamp_to_deposit() {
    let (mut chain, provider, client) = parties();
    let btc = service("btc-mainnet");
    chain.fund(client.address(), 1_000);

    chain
        .tx_at(2, open_contract(&client, &provider, &btc, Open::pay_as_you_go(10, 100, 1_000)))
        .unwrap();
    assert_eq!(chain.balance(client.address()), 0);

    // 20 units at rate 10, 10% to the reserve
    let events = chain
        .tx_at(3, claim(&client, provider.address(), 1, 20, 100))
        .unwrap();
    assert_eq!(events[0].ty, "contract_settlement");
    assert_eq!(events[0].get("paid"), Some("180"));
    assert_eq!(events[0].get("reserve"), Some("20"));
    assert_eq!(chain.balance(provider.address()), 180);
    assert_eq!(chain.balance(reserve()), 20);
    assert_eq!(chain.contract(1).paid, 200);

    // 150 units would be 1500, only 800 remains in escrow
    chain
        .tx_at(4, claim(&client, provider.address(), 1, 150, 100))
        .unwrap();
    let contract = chain.contract(1);
    assert_eq!(contract.paid, 1_000);
    assert_eq!(contract.nonce, 150);
    assert_eq!(chain.balance(provider.address()), 900);
    assert_eq!(chain.balance(reserve()), 100);

    let err = chain
        .tx_at(5, claim(&client, provider.address(), 1, 200, 100))
        .unwrap_err();
    assert!(err.contains("contract closed"), "{err}");
}

#[test]
fn test_stale_or_foreign_claims_rejected() {
    let (mut chain, provider, client) = parties();
    let btc = service("btc-mainnet");
    chain.fund(client.address(), 1_000);
    chain
        .tx_at(2, open_contract(&client, &provider, &btc, Open::pay_as_you_go(10, 100, 1_000)))
        .unwrap();
    chain
        .tx_at(3, claim(&client, provider.address(), 1, 5, 100))
        .unwrap();

    let replay = chain
        .tx_at(4, claim(&client, provider.address(), 1, 5, 100))
        .unwrap_err();
    assert!(replay.contains("bad nonce"), "{replay}");

    let expired = chain
        .tx_at(10, claim(&client, provider.address(), 1, 6, 9))
        .unwrap_err();
    assert!(expired.contains("signature expired"), "{expired}");

    // signed by the provider instead of the spender
    let forged = chain
        .tx_at(11, claim(&provider, provider.address(), 1, 6, 100))
        .unwrap_err();
    assert_eq!(forged, "invalid signature");
    assert_eq!(chain.contract(1).paid, 50);
}

#[test]
fn test_pay_as_you_go_close_waits_for_window() {
    let mut chain = Chain::new();
    let provider = key(1);
    let client = key(2);
    let btc = service("btc-mainnet");
    let terms = ProviderTerms {
        settlement_duration: 5,
        ..ProviderTerms::default()
    };
    chain.register_provider(&provider, &btc, &terms);
    chain.fund(client.address(), 1_000);

    chain
        .tx_at(
            2,
            open_contract(
                &client,
                &provider,
                &btc,
                Open::pay_as_you_go(10, 100, 1_000).settlement_duration(5),
            ),
        )
        .unwrap();
    chain.tx_at(3, claim(&client, provider.address(), 1, 10, 100)).unwrap();

    let events = chain.tx_at(4, close_contract(&client, 1, None)).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ty, "close_contract");
    let closing = chain.contract(1);
    assert_eq!(closing.closed_height, 4);
    assert!(!closing.is_settled());
    assert_eq!(
        chain.engine.queries().expiring_at(9).unwrap(),
        vec![1],
        "moved to the end of the window"
    );
    assert!(chain.engine.queries().expiring_at(102).unwrap().is_empty());

    let again = chain.tx_at(5, close_contract(&client, 1, None)).unwrap_err();
    assert!(again.contains("already closed"), "{again}");

    // late usage is still claimable inside the window
    chain.tx_at(6, claim(&client, provider.address(), 1, 30, 100)).unwrap();

    let result = chain.block_at(9, Vec::new());
    assert_eq!(events_of(&result, "contract_settlement").len(), 1);
    let settled = chain.contract(1);
    assert_eq!(settled.settlement_height, 9);
    assert_eq!(settled.paid, 300);
    assert_eq!(chain.balance(client.address()), 700);
    assert_eq!(chain.balance(provider.address()), 270);
    assert_eq!(chain.balance(reserve()), 30);
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

#[test]
fn test_subscription_close_pays_elapsed_and_refunds_rest() {
    let (mut chain, provider, client) = parties();
    let btc = service("btc-mainnet");
    chain.fund(client.address(), 10_000);

    chain
        .tx_at(10, open_contract(&client, &provider, &btc, Open::subscription(15, 100)))
        .unwrap();
    assert_eq!(chain.balance(client.address()), 8_500);

    let events = chain.tx_at(14, close_contract(&client, 1, None)).unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.ty.as_str()).collect();
    assert_eq!(kinds, ["contract_settlement", "close_contract"]);

    let contract = chain.contract(1);
    assert_eq!(contract.settlement_height, 14);
    assert_eq!(contract.paid, 60);
    assert_eq!(contract.deposit, 60);
    assert_eq!(chain.balance(provider.address()), 54);
    assert_eq!(chain.balance(reserve()), 6);
    assert_eq!(chain.balance(client.address()), 9_940);
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::ContractEscrow)), 0);
}

#[test]
fn test_one_open_contract_per_spender_until_expiry() {
    let (mut chain, provider, client) = parties();
    let btc = service("btc-mainnet");
    chain.fund(client.address(), 10_000);

    chain
        .tx_at(2, open_contract(&client, &provider, &btc, Open::subscription(15, 10)))
        .unwrap();
    let dup = chain
        .tx_at(5, open_contract(&client, &provider, &btc, Open::subscription(15, 10)))
        .unwrap_err();
    assert!(dup.contains("already open: id 1"), "{dup}");

    // still counted at its expiration height, the sweep runs after the txs
    let same_block = chain
        .tx_at(12, open_contract(&client, &provider, &btc, Open::subscription(15, 10)))
        .unwrap_err();
    assert!(same_block.contains("already open"), "{same_block}");
    let expired = chain.contract(1);
    assert_eq!(expired.settlement_height, 12);
    assert_eq!(expired.paid, 150);
    assert_eq!(chain.balance(provider.address()), 135);

    chain
        .tx_at(13, open_contract(&client, &provider, &btc, Open::subscription(15, 10)))
        .unwrap();
    let active = chain
        .engine
        .queries()
        .active_contract(&client.pubkey(), &provider.pubkey(), &btc)
        .unwrap()
        .expect("reopened");
    assert_eq!(active.id, 2);
}

#[test]
fn test_open_authorization_settles_without_signature() {
    let (mut chain, provider, client) = parties();
    let btc = service("btc-mainnet");
    chain.fund(client.address(), 10_000);
    chain
        .tx_at(
            2,
            open_contract(&client, &provider, &btc, Open::subscription(15, 10).open_authorization()),
        )
        .unwrap();

    let mut unsigned = claim(&client, key(9).address(), 1, 1, 100);
    if let Msg::ClaimContractIncome(msg) = &mut unsigned.msg {
        msg.signature.clear();
    }
    chain.tx_at(6, unsigned).unwrap();
    assert_eq!(chain.contract(1).paid, 60);
    assert_eq!(chain.balance(provider.address()), 54);
}

#[test]
fn test_pay_as_you_go_rejects_open_authorization() {
    let (mut chain, provider, client) = parties();
    chain.fund(client.address(), 1_000);
    let err = chain
        .tx_at(
            2,
            open_contract(
                &client,
                &provider,
                &service("btc-mainnet"),
                Open::pay_as_you_go(10, 100, 1_000).open_authorization(),
            ),
        )
        .unwrap_err();
    assert!(err.contains("open authorization"), "{err}");
    assert_eq!(chain.balance(client.address()), 1_000);
}

// =============================================================================
// DELEGATES
// =============================================================================

#[test]
fn test_delegate_is_the_spender() {
    let (mut chain, provider, client) = parties();
    let btc = service("btc-mainnet");
    let delegate = key(3);
    chain.fund(client.address(), 1_000);

    chain
        .tx_at(
            2,
            open_contract(
                &client,
                &provider,
                &btc,
                Open::pay_as_you_go(10, 100, 1_000).delegate(delegate.pubkey()),
            ),
        )
        .unwrap();
    let queries = chain.engine.queries();
    assert!(queries
        .active_contract(&delegate.pubkey(), &provider.pubkey(), &btc)
        .unwrap()
        .is_some());
    assert!(queries
        .active_contract(&client.pubkey(), &provider.pubkey(), &btc)
        .unwrap()
        .is_none());

    let by_client = chain
        .tx_at(3, claim(&client, provider.address(), 1, 10, 100))
        .unwrap_err();
    assert_eq!(by_client, "invalid signature");
    chain
        .tx_at(4, claim(&delegate, provider.address(), 1, 10, 100))
        .unwrap();

    let wrong = chain
        .tx_at(5, close_contract(&client, 1, Some(key(4).pubkey())))
        .unwrap_err();
    assert!(wrong.contains("delegate mismatch for contract 1"), "{wrong}");

    let err = chain.tx_at(6, close_signed_by(&delegate, &client)).unwrap_err();
    assert!(err.contains("close unauthorized"), "{err}");

    chain
        .tx_at(7, close_contract(&client, 1, Some(delegate.pubkey())))
        .unwrap();
    let contract = chain.contract(1);
    assert!(contract.is_settled());
    assert_eq!(contract.paid, 100);
    assert_eq!(chain.balance(client.address()), 900);
    assert!(chain
        .engine
        .queries()
        .spender_contracts(&delegate.pubkey())
        .unwrap()
        .is_empty());
}

/// A close naming `client` but submitted from the delegate's account.
fn close_signed_by(delegate: &Ed25519KeyPair, client: &Ed25519KeyPair) -> SignedMsg {
    let mut msg = close_contract(client, 1, Some(delegate.pubkey()));
    msg.signer = delegate.address();
    msg
}

// =============================================================================
// PROVIDERS
// =============================================================================

#[test]
fn test_withdrawing_bond_closes_provider() {
    let (mut chain, provider, client) = parties();
    let btc = service("btc-mainnet");
    chain.fund(client.address(), 1_000);

    let over = chain
        .tx_at(2, bond_provider(&provider, &btc, -(MIN_BOND as i128) - 1))
        .unwrap_err();
    assert!(over.contains("insufficient bond"), "{over}");

    // below the floor the provider stays listed but takes no contracts
    chain.tx_at(3, bond_provider(&provider, &btc, -1)).unwrap();
    assert_eq!(chain.provider(&provider, &btc).map(|p| p.bond), Some(MIN_BOND - 1));
    let starved = chain
        .tx_at(4, open_contract(&client, &provider, &btc, Open::pay_as_you_go(10, 100, 1_000)))
        .unwrap_err();
    assert!(starved.contains("insufficient bond"), "{starved}");

    let events = chain
        .tx_at(5, bond_provider(&provider, &btc, -(MIN_BOND as i128) + 1))
        .unwrap();
    assert_eq!(events[0].get("bond_abs"), Some("0"));
    assert!(chain.provider(&provider, &btc).is_none());
    assert_eq!(chain.balance(provider.address()), MIN_BOND);
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::ProviderBond)), 0);

    let gone = chain
        .tx_at(6, open_contract(&client, &provider, &btc, Open::pay_as_you_go(10, 100, 1_000)))
        .unwrap_err();
    assert!(gone.contains("provider not found"), "{gone}");
}

#[test]
fn test_provider_terms_gate_open() {
    let mut chain = Chain::new();
    let provider = key(1);
    let client = key(2);
    let btc = service("btc-mainnet");
    let terms = ProviderTerms {
        min_contract_duration: 10,
        max_contract_duration: 50,
        pay_as_you_go_enabled: false,
        ..ProviderTerms::default()
    };
    chain.register_provider(&provider, &btc, &terms);
    chain.fund(client.address(), 10_000);

    let short = chain
        .tx_at(2, open_contract(&client, &provider, &btc, Open::subscription(15, 5)))
        .unwrap_err();
    assert!(short.contains("outside [10, 50]"), "{short}");

    let rate = chain
        .tx_at(3, open_contract(&client, &provider, &btc, Open::subscription(16, 20)))
        .unwrap_err();
    assert!(rate.contains("mismatch rate"), "{rate}");

    let payg = chain
        .tx_at(4, open_contract(&client, &provider, &btc, Open::pay_as_you_go(10, 20, 500)))
        .unwrap_err();
    assert!(payg.contains("mismatch rate"), "{payg}");

    let offline = ProviderTerms {
        metadata_nonce: 2,
        status: ProviderStatus::Offline,
        ..terms.clone()
    };
    chain.tx_at(5, mod_provider(&provider, &btc, &offline)).unwrap();
    let err = chain
        .tx_at(6, open_contract(&client, &provider, &btc, Open::subscription(15, 20)))
        .unwrap_err();
    assert!(err.contains("offline"), "{err}");
    assert_eq!(chain.balance(client.address()), 10_000);
}

#[test]
fn test_open_cost_goes_to_reserve() {
    let mut chain = Chain::with_config(EngineConfig {
        open_contract_cost: 500,
        ..test_config()
    });
    let provider = key(1);
    let client = key(2);
    let btc = service("btc-mainnet");
    chain.register_provider(&provider, &btc, &ProviderTerms::default());
    chain.fund(client.address(), 2_000);

    let events = chain
        .tx_at(2, open_contract(&client, &provider, &btc, Open::subscription(15, 10)))
        .unwrap();
    assert_eq!(events[0].get("open_cost"), Some("500"));
    assert_eq!(chain.balance(client.address()), 1_350);
    assert_eq!(chain.balance(reserve()), 500);
    assert_eq!(chain.balance(Holder::Module(ModuleAccount::ContractEscrow)), 150);
}

#[test]
fn test_services_are_independent() {
    let mut chain = Chain::new();
    let provider = key(1);
    let client = key(2);
    let btc = service("btc-mainnet");
    let eth = service("eth-mainnet");
    chain.register_provider(&provider, &btc, &ProviderTerms::default());
    chain.register_provider(&provider, &eth, &ProviderTerms::default());
    chain.fund(client.address(), 10_000);

    let result = chain.block(vec![
        open_contract(&client, &provider, &btc, Open::subscription(15, 10)),
        open_contract(&client, &provider, &eth, Open::subscription(15, 10)),
    ]);
    assert!(result.tx_results.iter().all(|r| r.is_ok()), "{result:?}");
    assert_eq!(chain.engine.queries().providers().unwrap().len(), 2);
    assert_eq!(
        chain
            .engine
            .queries()
            .spender_contracts(&client.pubkey())
            .unwrap()
            .len(),
        2
    );
}

// =============================================================================
// SERVICE REGISTRY
// =============================================================================

#[test]
fn test_registry_gates_new_providers_and_contracts() {
    let mut chain = Chain::new();
    let provider = key(1);
    let client = key(2);
    let admin = authority();
    let sol = service("sol-mainnet");
    chain.fund(client.address(), 10_000);

    let err = chain
        .tx_at(1, bond_provider(&provider, &sol, MIN_BOND as i128))
        .unwrap_err();
    assert!(err.contains("service not found"), "{err}");
    let err = chain.tx_at(2, register_service(&provider, 3, &sol)).unwrap_err();
    assert!(err.contains("unauthorized"), "{err}");
    let err = chain
        .tx_at(3, register_service(&admin, 1, &sol))
        .unwrap_err();
    assert!(err.contains("service id already exists"), "{err}");

    let events = chain.tx_at(4, register_service(&admin, 3, &sol)).unwrap();
    assert_eq!(events[0].ty, "register_service");
    chain.register_provider(&provider, &sol, &ProviderTerms::default());
    let events = chain
        .tx_at(6, update_service(&admin, 3, &sol, "solana rpc"))
        .unwrap();
    assert_eq!(events[0].get("description"), Some("solana rpc"));
    let err = chain
        .tx_at(7, update_service(&admin, 4, &sol, "solana rpc"))
        .unwrap_err();
    assert!(err.contains("id mismatch"), "{err}");

    let opened = chain.tx_at(8, open_contract(&client, &provider, &sol, Open::subscription(15, 10)));
    assert!(opened.is_ok(), "{opened:?}");
    chain.tx_at(9, remove_service(&admin, &sol)).unwrap();
    assert!(chain.engine.queries().service(&sol).unwrap().is_none());

    // nothing new attaches, but the open contract still settles and the
    // bond can still be withdrawn
    let err = chain
        .tx_at(10, open_contract(&key(3), &provider, &sol, Open::subscription(15, 10)))
        .unwrap_err();
    assert!(err.contains("service not found"), "{err}");
    chain.block_at(18, Vec::new());
    assert_eq!(chain.contract(1).settlement_height, 18);
    chain
        .tx_at(19, bond_provider(&provider, &sol, -(MIN_BOND as i128)))
        .unwrap();
    assert!(chain.provider(&provider, &sol).is_none());
    assert_eq!(chain.balance(provider.address()), MIN_BOND + 135);
}
