use actix_web::{HttpResponse, get, post, web};
use log::{info, warn};

use super::models::{AppState, MempoolResponse, NewTxRequest, NewTxResponse};
use crate::error::{Error, Result};

/// Queue a transaction for the next mined block.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> Result<HttpResponse> {
    let req = body.into_inner();
    if let Err(e) = validate_request(&req) {
        warn!("POST /tx/ - rejected: {}", e);
        return Err(e);
    }

    let block_index = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.add_transaction(req.sender, req.receiver, req.amount)?
    };
    info!("POST /tx/ - queued for block #{}", block_index);

    Ok(HttpResponse::Ok().json(NewTxResponse {
        message: format!("This transaction will be added to block {block_index}"),
        block_index,
    }))
}

/// List transactions waiting for the next block.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> HttpResponse {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(MempoolResponse {
        size: ledger.pending.len(),
        transactions: &ledger.pending,
    })
}

/// Presence checks only; amount sign is not restricted.
fn validate_request(req: &NewTxRequest) -> Result<()> {
    if req.sender.is_empty() {
        return Err(Error::MalformedInput("sender must not be empty".into()));
    }
    if req.receiver.is_empty() {
        return Err(Error::MalformedInput("receiver must not be empty".into()));
    }
    if req.amount == 0.0 {
        return Err(Error::MalformedInput("amount must not be zero".into()));
    }
    Ok(())
}
