mod api;
mod blockchain;
mod config;
mod error;
mod network;
mod transaction;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{info, warn};
use std::io;
use tokio_util::sync::CancellationToken;

use api::AppState;
use config::NodeConfig;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = NodeConfig::from_env();
    let (host, port) = (config.host.clone(), config.port);
    let bootstrap_peers = config.bootstrap_peers.clone();

    println!(
        "⛓️ Starting PoW node {} at http://{host}:{port}",
        config.node_id
    );

    let shutdown = CancellationToken::new();
    let state = AppState::new(config, shutdown.clone()).map_err(io::Error::other)?;
    {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        for peer in &bootstrap_peers {
            match ledger.add_peer(peer) {
                Ok(identity) => info!("PEERS - bootstrap peer {}", identity),
                Err(e) => warn!("PEERS - ignoring bootstrap peer: {}", e),
            }
        }
    }
    let state = web::Data::new(state);

    // Abort in-flight proof searches as soon as a stop is requested.
    actix_web::rt::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        }
    });

    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await;

    shutdown.cancel();
    result
}
