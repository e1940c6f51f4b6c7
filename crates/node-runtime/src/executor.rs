//! # Block Executor
//!
//! One tokio task owns the engine. Blocks and queries arrive over a bounded
//! mpsc channel and are answered over oneshot replies, so every state
//! mutation happens sequentially no matter how many callers hold a handle.
//!
//! A fatal engine error halts the executor: the reason is recorded and every
//! later block is refused. Queries keep working against the last committed
//! state.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{BlockHeight, Holder, PubKey, Service};
use thiserror::Error;
use tg_contract_engine::{
    BalanceLedger, Block, BlockResult, Contract, ContractEngine, ContractQueryApi, EngineError,
    KeyVerifier, KvStore, Provider, ServiceRecord, ValidatorRegistry,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Read-only request answered from committed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Service { name: Service },
    Services,
    Provider { provider: PubKey, service: Service },
    Providers,
    Contract { id: u64 },
    ActiveContract {
        spender: PubKey,
        provider: PubKey,
        service: Service,
    },
    SpenderContracts { spender: PubKey },
    ExpiringAt { height: BlockHeight },
    NextContractId,
    ProtocolVersion,
    Balance { holder: Holder, denom: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResponse {
    Service(Option<ServiceRecord>),
    Services(Vec<ServiceRecord>),
    Provider(Option<Provider>),
    Providers(Vec<Provider>),
    Contract(Option<Contract>),
    Contracts(Vec<Contract>),
    ContractIds(Vec<u64>),
    NextContractId(u64),
    ProtocolVersion(i64),
    Balance(u128),
}

/// Executor failures.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A fatal error stopped block execution earlier.
    #[error("executor halted: {0}")]
    Halted(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The executor task is gone.
    #[error("executor channel closed")]
    ChannelClosed,
}

enum Command {
    ExecuteBlock {
        block: Block,
        reply: oneshot::Sender<Result<BlockResult, ExecutorError>>,
    },
    Query {
        query: Query,
        reply: oneshot::Sender<Result<QueryResponse, ExecutorError>>,
    },
}

type HaltState = Arc<RwLock<Option<String>>>;

/// Cloneable handle to the executor task.
#[derive(Clone)]
pub struct ExecutorHandle {
    tx: mpsc::Sender<Command>,
    halted: HaltState,
}

impl ExecutorHandle {
    /// Queue a block and wait for its result.
    pub async fn execute_block(&self, block: Block) -> Result<BlockResult, ExecutorError> {
        if let Some(reason) = self.halted() {
            return Err(ExecutorError::Halted(reason));
        }
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::ExecuteBlock { block, reply })
            .await
            .map_err(|_| ExecutorError::ChannelClosed)?;
        rx.await.map_err(|_| ExecutorError::ChannelClosed)?
    }

    pub async fn query(&self, query: Query) -> Result<QueryResponse, ExecutorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Query { query, reply })
            .await
            .map_err(|_| ExecutorError::ChannelClosed)?;
        rx.await.map_err(|_| ExecutorError::ChannelClosed)?
    }

    /// Reason of the fatal halt, if any.
    pub fn halted(&self) -> Option<String> {
        self.halted.read().clone()
    }
}

/// Move `engine` into its own task.
///
/// The task returns the engine once every handle is dropped.
pub fn spawn<S, L, R, V>(
    engine: ContractEngine<S, L, R, V>,
    capacity: usize,
) -> (ExecutorHandle, JoinHandle<ContractEngine<S, L, R, V>>)
where
    S: KvStore + Send + 'static,
    L: BalanceLedger + Send + 'static,
    R: ValidatorRegistry + Send + 'static,
    V: KeyVerifier + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let halted: HaltState = Arc::new(RwLock::new(None));
    let task = tokio::spawn(run(engine, rx, Arc::clone(&halted)));
    (ExecutorHandle { tx, halted }, task)
}

async fn run<S, L, R, V>(
    mut engine: ContractEngine<S, L, R, V>,
    mut rx: mpsc::Receiver<Command>,
    halted: HaltState,
) -> ContractEngine<S, L, R, V>
where
    S: KvStore,
    L: BalanceLedger,
    R: ValidatorRegistry,
    V: KeyVerifier,
{
    info!("executor started");
    while let Some(command) = rx.recv().await {
        match command {
            Command::ExecuteBlock { block, reply } => {
                let result = execute(&mut engine, &block, &halted);
                if reply.send(result).is_err() {
                    debug!(height = block.header.height, "caller dropped before block result");
                }
            }
            Command::Query { query, reply } => {
                let result = answer(&engine, &query).map_err(ExecutorError::from);
                if reply.send(result).is_err() {
                    debug!("caller dropped before query result");
                }
            }
        }
    }
    info!("executor channel closed, stopping");
    engine
}

fn execute<S, L, R, V>(
    engine: &mut ContractEngine<S, L, R, V>,
    block: &Block,
    halted: &HaltState,
) -> Result<BlockResult, ExecutorError>
where
    S: KvStore,
    L: BalanceLedger,
    R: ValidatorRegistry,
    V: KeyVerifier,
{
    if let Some(reason) = halted.read().clone() {
        warn!(height = block.header.height, "block refused, executor halted");
        return Err(ExecutorError::Halted(reason));
    }
    match engine.execute_block(block) {
        Ok(result) => Ok(result),
        Err(err) => {
            if err.is_fatal() {
                error!(height = block.header.height, error = %err, "fatal engine error, halting");
                *halted.write() = Some(err.to_string());
            }
            Err(err.into())
        }
    }
}

fn answer<S, L, R, V>(engine: &ContractEngine<S, L, R, V>, query: &Query) -> Result<QueryResponse, EngineError>
where
    S: KvStore,
    L: BalanceLedger,
    R: ValidatorRegistry,
    V: KeyVerifier,
{
    let q = engine.queries();
    Ok(match query {
        Query::Service { name } => QueryResponse::Service(q.service(name)?),
        Query::Services => QueryResponse::Services(q.services()?),
        Query::Provider { provider, service } => QueryResponse::Provider(q.provider(provider, service)?),
        Query::Providers => QueryResponse::Providers(q.providers()?),
        Query::Contract { id } => QueryResponse::Contract(q.contract(*id)?),
        Query::ActiveContract {
            spender,
            provider,
            service,
        } => QueryResponse::Contract(q.active_contract(spender, provider, service)?),
        Query::SpenderContracts { spender } => QueryResponse::Contracts(q.spender_contracts(spender)?),
        Query::ExpiringAt { height } => QueryResponse::ContractIds(q.expiring_at(*height)?),
        Query::NextContractId => QueryResponse::NextContractId(q.next_contract_id()?),
        Query::ProtocolVersion => QueryResponse::ProtocolVersion(q.protocol_version()?),
        Query::Balance { holder, denom } => QueryResponse::Balance(engine.ledger().balance(holder, denom)?),
    })
}
