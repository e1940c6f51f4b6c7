//! # TollGate Engine Benchmarks
//!
//! | Path | Work per block |
//! |------|----------------|
//! | claim settlement | signature check, debt split, two transfers per claim |
//! | expiration sweep | finalize and refund every due contract |
//! | empty block | version gate, payout, full invariant scan |

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use shared_crypto::Ed25519KeyPair;
use std::time::Duration;
use tg_tests::fixtures::*;

fn client(i: u32) -> Ed25519KeyPair {
    let mut seed = [0xAA; 32];
    seed[..4].copy_from_slice(&i.to_le_bytes());
    Ed25519KeyPair::from_seed(seed)
}

/// A chain at height 2 with `n` clients each holding one open contract.
fn chain_with_contracts(n: u32, open: Open) -> (Chain, Ed25519KeyPair, Vec<Ed25519KeyPair>) {
    let mut chain = Chain::new();
    let provider = key(1);
    let btc = service("btc-mainnet");
    chain.register_provider(&provider, &btc, &ProviderTerms::default());

    let clients: Vec<_> = (0..n).map(client).collect();
    let mut txs = Vec::with_capacity(clients.len());
    for c in &clients {
        chain.fund(c.address(), open.deposit);
        txs.push(open_contract(c, &provider, &btc, open.clone()));
    }
    chain.block(txs);
    (chain, provider, clients)
}

// ============================================================================
// Claim settlement
// ============================================================================

fn bench_claim_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim-settlement");
    group.measurement_time(Duration::from_secs(10));

    for size in [10u32, 100, 250] {
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::new("claims_per_block", size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let (chain, provider, clients) =
                        chain_with_contracts(size, Open::pay_as_you_go(10, 1_000, 10_000));
                    let claims: Vec<_> = clients
                        .iter()
                        .enumerate()
                        .map(|(i, c)| claim(c, provider.address(), i as u64 + 1, 50, 100))
                        .collect();
                    (chain, claims)
                },
                |(mut chain, claims)| black_box(chain.block(claims)),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

// ============================================================================
// Expiration sweep
// ============================================================================

fn bench_expiration_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("expiration-sweep");
    group.measurement_time(Duration::from_secs(10));

    for size in [10u32, 100, 250] {
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::new("due_contracts", size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let (mut chain, _, _) = chain_with_contracts(size, Open::subscription(15, 10));
                    chain.block_at(11, Vec::new());
                    chain
                },
                |mut chain| black_box(chain.block(Vec::new())),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

// ============================================================================
// Empty blocks
// ============================================================================

fn bench_empty_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("empty-block");

    for contracts in [0u32, 100] {
        group.bench_with_input(
            BenchmarkId::new("open_contracts", contracts),
            &contracts,
            |b, &contracts| {
                let (mut chain, _, _) = chain_with_contracts(contracts, Open::subscription(15, 1_000));
                b.iter(|| black_box(chain.block(Vec::new())))
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_claim_settlement,
    bench_expiration_sweep,
    bench_empty_block
);
criterion_main!(benches);
