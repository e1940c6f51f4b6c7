//! Line protocol of the binary: one JSON [`Request`] per input line, one
//! JSON [`Response`] per output line.

use serde::{Deserialize, Serialize};
use tg_contract_engine::{Block, BlockResult};

use crate::executor::{ExecutorError, ExecutorHandle, Query, QueryResponse};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    Block(Block),
    Query(Query),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Block(BlockResult),
    Query(QueryResponse),
    Error(String),
}

impl Request {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Run against the executor. Halts surface as `Err`; every other failure
    /// becomes a [`Response::Error`].
    pub async fn dispatch(self, executor: &ExecutorHandle) -> Result<Response, ExecutorError> {
        let outcome = match self {
            Request::Block(block) => executor.execute_block(block).await.map(Response::Block),
            Request::Query(query) => executor.query(query).await.map(Response::Query),
        };
        match outcome {
            Ok(response) => Ok(response),
            Err(err @ (ExecutorError::Halted(_) | ExecutorError::ChannelClosed)) => Err(err),
            Err(ExecutorError::Engine(err)) if err.is_fatal() => {
                Err(ExecutorError::Engine(err))
            }
            Err(err) => Ok(Response::Error(err.to_string())),
        }
    }
}
