mod chain;
mod health;
pub mod models;
mod peers;
mod tx;

use actix_web::web::{self, ServiceConfig};

use crate::error::Error;

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    // Undecodable bodies surface as MalformedInput with a JSON error body.
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| Error::MalformedInput(err.to_string()).into());

    cfg.service(
        web::scope("/api/v1")
            .app_data(json_config)
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::replace_chain)
            .service(tx::post_transaction)
            .service(tx::get_mempool)
            .service(peers::connect_peers)
            .service(peers::list_peers),
    );
}
