use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::blockchain::{Block, Ledger};
use crate::config::NodeConfig;
use crate::error::Result;
use crate::network::{ConsensusResolver, HttpChainFetcher};
use crate::transaction::Transaction;

/// Shared application state: the ledger plus what the handlers need to
/// mine and talk to peers.
pub struct AppState {
    pub ledger: Mutex<Ledger>,
    pub resolver: ConsensusResolver<HttpChainFetcher>,
    pub config: NodeConfig,
    /// Cancelled on process shutdown; proof searches run on child tokens.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: NodeConfig, shutdown: CancellationToken) -> Result<Self> {
        let fetcher = HttpChainFetcher::new(config.peer_timeout)?;
        Ok(Self {
            ledger: Mutex::new(Ledger::new()),
            resolver: ConsensusResolver::new(fetcher, config.peer_concurrency),
            config,
            shutdown,
        })
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub chain: &'a [Block],
    pub length: usize,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub message: String,
    /// 0-based position of the first block that failed validation.
    pub invalid_at: Option<usize>,
}

#[derive(Serialize)]
pub struct ReplaceResponse {
    pub replaced: bool,
    pub message: &'static str,
    pub length: usize,
    pub chain: Vec<Block>,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub message: String,
    pub block_index: u64,
}

#[derive(Serialize)]
pub struct MempoolResponse<'a> {
    pub size: usize,
    pub transactions: &'a [Transaction],
}

/* ---------- Peer API Models ---------- */

#[derive(Deserialize)]
pub struct ConnectPeersRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub message: &'static str,
    pub total: usize,
    pub peers: Vec<String>,
}
