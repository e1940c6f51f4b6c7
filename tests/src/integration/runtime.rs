//! Node runtime: bootstrap from config, then JSON requests through the executor.

use node_runtime::container::DevBalance;
use node_runtime::{
    build_engine, spawn, ExecutorError, NodeConfig, Query, QueryResponse, Request, Response,
};
use shared_types::{Coin, Holder, ModuleAccount};
use tg_contract_engine::{BalanceLedger, Block, BlockHeader, EngineError, SignedMsg};

use crate::fixtures::*;

fn node_config() -> NodeConfig {
    NodeConfig {
        engine: test_config(),
        dev_balances: vec![
            DevBalance {
                address: key(1).address(),
                coin: Coin::new(DENOM, MIN_BOND),
            },
            DevBalance {
                address: key(2).address(),
                coin: Coin::new(DENOM, 10_000),
            },
        ],
        genesis_services: genesis_services(),
        ..NodeConfig::default()
    }
}

/// A block as the binary reads it: one JSON line.
fn block_line(height: i64, txs: Vec<SignedMsg>) -> String {
    let request = Request::Block(Block {
        header: BlockHeader {
            height,
            chain_id: CHAIN_ID.to_string(),
        },
        txs,
        votes: Vec::new(),
    });
    serde_json::to_string(&request).expect("serialize request")
}

#[tokio::test]
async fn test_json_blocks_and_queries_through_executor() {
    let engine = build_engine(&node_config()).unwrap();
    let (handle, task) = spawn(engine, 8);
    let provider = key(1);
    let client = key(2);
    let btc = service("btc-mainnet");

    let line = block_line(
        1,
        vec![
            bond_provider(&provider, &btc, MIN_BOND as i128),
            mod_provider(&provider, &btc, &ProviderTerms::default()),
            open_contract(&client, &provider, &btc, Open::subscription(15, 10)),
        ],
    );
    let response = Request::parse(&line).unwrap().dispatch(&handle).await.unwrap();
    let result = match response {
        Response::Block(result) => result,
        other => panic!("expected block result, got {other:?}"),
    };
    assert!(result.tx_results.iter().all(|r| r.is_ok()), "{result:?}");

    let query = Request::parse(r#"{"query": "next_contract_id"}"#).unwrap();
    assert_eq!(
        query.dispatch(&handle).await.unwrap(),
        Response::Query(QueryResponse::NextContractId(2))
    );

    let balance = Request::Query(Query::Balance {
        holder: Holder::Module(ModuleAccount::ContractEscrow),
        denom: DENOM.to_string(),
    });
    let line = serde_json::to_string(&balance).unwrap();
    assert_eq!(
        Request::parse(&line).unwrap().dispatch(&handle).await.unwrap(),
        Response::Query(QueryResponse::Balance(150))
    );

    let json = serde_json::to_value(
        Request::Query(Query::ActiveContract {
            spender: client.pubkey(),
            provider: provider.pubkey(),
            service: btc.clone(),
        })
        .dispatch(&handle)
        .await
        .unwrap(),
    )
    .unwrap();
    assert_eq!(json["query"]["contract"]["id"], 1);

    for height in 2..=10 {
        let response = Request::parse(&block_line(height, Vec::new()))
            .unwrap()
            .dispatch(&handle)
            .await
            .unwrap();
        assert!(matches!(response, Response::Block(_)));
    }
    let skipped = Request::parse(&block_line(12, Vec::new()))
        .unwrap()
        .dispatch(&handle)
        .await
        .unwrap_err();
    assert!(matches!(
        skipped,
        ExecutorError::Engine(EngineError::UnexpectedHeight { expected: 11, actual: 12 })
    ));
    assert!(handle.halted().is_none());

    // expiration sweep at height 11
    let response = Request::parse(&block_line(11, Vec::new()))
        .unwrap()
        .dispatch(&handle)
        .await
        .unwrap();
    let result = match response {
        Response::Block(result) => result,
        other => panic!("expected block result, got {other:?}"),
    };
    assert_eq!(events_of(&result, "contract_settlement").len(), 1);

    drop(handle);
    let engine = task.await.unwrap();
    assert_eq!(
        engine
            .ledger()
            .balance(&Holder::Account(client.address()), DENOM)
            .unwrap(),
        10_000 - 150
    );
}

#[tokio::test]
async fn test_fatal_block_halts_runtime() {
    let provider = key(1);
    let btc = service("btc-mainnet");
    let mut engine = build_engine(&node_config()).unwrap();
    engine
        .execute_block(&Block {
            header: BlockHeader {
                height: 1,
                chain_id: CHAIN_ID.to_string(),
            },
            txs: vec![bond_provider(&provider, &btc, MIN_BOND as i128)],
            votes: Vec::new(),
        })
        .unwrap();
    // tokens leave the bond pool outside any message
    engine
        .ledger_mut()
        .burn(&Holder::Module(ModuleAccount::ProviderBond), &Coin::new(DENOM, 1))
        .unwrap();
    let (handle, _task) = spawn(engine, 8);

    let err = Request::parse(&block_line(2, Vec::new()))
        .unwrap()
        .dispatch(&handle)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Engine(ref e) if e.is_fatal()), "{err}");
    assert!(handle.halted().unwrap().contains("invariant broken"));

    let err = Request::parse(&block_line(3, Vec::new()))
        .unwrap()
        .dispatch(&handle)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Halted(_)));

    // committed state stays readable
    let response = Request::Query(Query::Provider {
        provider: provider.pubkey(),
        service: btc,
    })
    .dispatch(&handle)
    .await
    .unwrap();
    let stored = match response {
        Response::Query(QueryResponse::Provider(Some(stored))) => stored,
        other => panic!("expected provider, got {other:?}"),
    };
    assert_eq!(stored.bond, MIN_BOND);
}

#[test]
fn test_genesis_version_without_own_config() {
    let config = NodeConfig {
        genesis_version: 4,
        ..node_config()
    };
    // version 4 runs on the latest entry below it
    let engine = build_engine(&config).unwrap();
    assert_eq!(engine.configs().for_version(4).unwrap(), &test_config());
    assert_eq!(engine.configs().latest_version(), 1);
}
