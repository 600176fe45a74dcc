use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::blockchain::DEFAULT_MINING_REWARD;

/// Node settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    /// Identity this node signs its mining rewards from.
    pub node_id: String,
    /// Receiver of the mining reward.
    pub miner_name: String,
    pub mining_reward: f64,
    pub peer_timeout: Duration,
    pub peer_concurrency: usize,
    pub mine_timeout: Option<Duration>,
    pub bootstrap_peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl NodeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16);
        let node_id = lookup("NODE_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let miner_name = lookup("MINER_NAME").unwrap_or_else(|| "miner".to_string());
        // A non-finite amount serializes as `null`, which no peer can decode.
        let mining_reward = Some(parse_or(&lookup, "MINING_REWARD", DEFAULT_MINING_REWARD))
            .filter(|reward: &f64| reward.is_finite())
            .unwrap_or_else(|| {
                warn!("CONFIG - MINING_REWARD must be finite, using default");
                DEFAULT_MINING_REWARD
            });
        let peer_timeout = Duration::from_millis(parse_or(&lookup, "PEER_TIMEOUT_MS", 3000u64));
        let peer_concurrency = parse_or(&lookup, "PEER_CONCURRENCY", 4usize).max(1);
        let mine_timeout = lookup("MINE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let bootstrap_peers = lookup("PEERS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            port,
            node_id,
            miner_name,
            mining_reward,
            peer_timeout,
            peer_concurrency,
            mine_timeout,
            bootstrap_peers,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("CONFIG - {}={:?} is not valid, using default", key, raw);
            default
        }),
        None => default,
    }
}
