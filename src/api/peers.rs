use actix_web::{HttpResponse, get, post, web};
use log::info;

use super::models::{AppState, ConnectPeersRequest, PeersResponse};
use crate::error::{Error, Result};
use crate::network::PeerSet;

/// Register peers. Every address is checked before any is added.
#[post("/peers/")]
pub async fn connect_peers(
    state: web::Data<AppState>,
    body: web::Json<ConnectPeersRequest>,
) -> Result<HttpResponse> {
    if body.nodes.is_empty() {
        return Err(Error::MalformedInput("nodes list is empty".into()));
    }
    let identities = body
        .nodes
        .iter()
        .map(|address| PeerSet::normalize(address))
        .collect::<Result<Vec<_>>>()?;

    let peers = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        let mut added = 0;
        for identity in &identities {
            if !ledger.peers.contains(identity) {
                added += 1;
            }
            ledger.add_peer(identity)?;
        }
        info!(
            "PEERS - {} new, now connected to {} peers",
            added,
            ledger.peers.len()
        );
        ledger.peers.list()
    };

    Ok(HttpResponse::Created().json(PeersResponse {
        message: "All the nodes are now connected",
        total: peers.len(),
        peers,
    }))
}

#[get("/peers/")]
pub async fn list_peers(state: web::Data<AppState>) -> HttpResponse {
    let peers = state.ledger.lock().expect("mutex poisoned").peers.list();
    HttpResponse::Ok().json(PeersResponse {
        message: "Known peers",
        total: peers.len(),
        peers,
    })
}
