use actix_web::{HttpResponse, get, post, web};
use log::{debug, info, warn};
use std::time::Instant;

use super::models::{AppState, ChainResponse, ReplaceResponse, ValidateResponse};
use crate::blockchain::pow;
use crate::error::{Error, Result};
use crate::transaction::Transaction;

/// Export the full chain; peers poll this during consensus.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> HttpResponse {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ChainResponse {
        chain: &ledger.chain,
        length: ledger.len(),
    })
}

/// Validate the whole local chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> Result<HttpResponse> {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let resp = match ledger.is_valid() {
        Ok(()) => ValidateResponse {
            valid: true,
            length: ledger.len(),
            message: "This blockchain is valid".to_string(),
            invalid_at: None,
        },
        Err(Error::InvalidChain { position, fault }) => {
            warn!("VALIDATE - local chain broken at position {}: {}", position, fault);
            ValidateResponse {
                valid: false,
                length: ledger.len(),
                message: format!("This blockchain is invalid at position {position}: {fault}"),
                invalid_at: Some(position),
            }
        }
        Err(e) => return Err(e),
    };
    Ok(HttpResponse::Ok().json(resp))
}

/// Mine a new block on top of the current tip:
/// - Solve the puzzle off the request thread, cancellable
/// - Append the reward transaction and seal all pending txs into the block
/// - Reject if the tip moved while solving
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>) -> Result<HttpResponse> {
    let (previous_proof, previous_hash) = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.tip()?
    };

    // Cancelled on shutdown, on timeout, or when this request is dropped.
    let token = state.shutdown.child_token();
    let _cancel_on_drop = token.clone().drop_guard();

    let t0 = Instant::now();
    let search = web::block({
        let token = token.clone();
        move || pow::solve(previous_proof, &token)
    });
    let joined = match state.config.mine_timeout {
        Some(limit) => match tokio::time::timeout(limit, search).await {
            Ok(joined) => joined,
            Err(_) => {
                token.cancel();
                warn!("MINER - gave up after {:?}", limit);
                return Err(Error::MiningTimeout(limit));
            }
        },
        None => search.await,
    };
    let proof = joined.map_err(|e| Error::Blocking(e.to_string()))??;
    debug!(
        "MINER - proof {} found in {} ms",
        proof,
        t0.elapsed().as_millis()
    );

    let reward = Transaction::new(
        &state.config.node_id,
        &state.config.miner_name,
        state.config.mining_reward,
    );
    let block = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.seal_block(proof, previous_hash, reward)?.clone()
    };

    info!(
        "MINER - sealed block #{} (proof={}, txs={})",
        block.index,
        block.proof,
        block.transactions.len()
    );
    Ok(HttpResponse::Ok().json(block))
}

/// Adopt the longest valid chain among known peers, if it beats ours.
#[post("/replace-chain/")]
pub async fn replace_chain(state: web::Data<AppState>) -> HttpResponse {
    let (replaced, chain) = state.resolver.resolve(&state.ledger).await;
    let message = if replaced {
        "The chain was replaced by the longest valid chain among peers"
    } else {
        "All good. The local chain is the longest one"
    };
    HttpResponse::Ok().json(ReplaceResponse {
        replaced,
        message,
        length: chain.len(),
        chain,
    })
}
