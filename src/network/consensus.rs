use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

use super::CHAIN_EXPORT_PATH;
use crate::blockchain::{Block, Ledger, validator};
use crate::error::{Error, Result};

/// Chain export payload, as served by `GET /api/v1/chain/`.
#[derive(Debug, Deserialize)]
pub struct PeerChain {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl PeerChain {
    /// Unwrap the chain, rejecting payloads that contradict themselves.
    pub fn into_chain(self, peer: &str) -> Result<Vec<Block>> {
        if self.chain.is_empty() {
            return Err(Error::MalformedPeerResponse(
                peer.to_string(),
                "empty chain".into(),
            ));
        }
        if self.length != self.chain.len() {
            return Err(Error::MalformedPeerResponse(
                peer.to_string(),
                format!(
                    "advertised length {} but sent {} blocks",
                    self.length,
                    self.chain.len()
                ),
            ));
        }
        Ok(self.chain)
    }
}

/// Source of a peer's advertised chain.
#[allow(async_fn_in_trait)]
pub trait ChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>>;
}

/// Fetches peer chains over HTTP with a per-request timeout.
#[derive(Clone)]
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>> {
        let url = format!("{peer}{CHAIN_EXPORT_PATH}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::UnreachablePeer(peer.to_string(), e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::MalformedPeerResponse(
                peer.to_string(),
                format!("status {}", response.status()),
            ));
        }

        let payload: PeerChain = response
            .json()
            .await
            .map_err(|e| Error::MalformedPeerResponse(peer.to_string(), e.to_string()))?;
        payload.into_chain(peer)
    }
}

/// Longest-valid-chain resolution against every known peer.
pub struct ConsensusResolver<F> {
    fetcher: F,
    concurrency: usize,
}

impl<F: ChainFetcher> ConsensusResolver<F> {
    pub fn new(fetcher: F, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Poll all peers and adopt the longest valid chain if it beats ours.
    ///
    /// The ledger lock is not held while peers are fetched; the swap
    /// re-checks length and validity under the lock.
    pub async fn resolve(&self, ledger: &Mutex<Ledger>) -> (bool, Vec<Block>) {
        let (peers, local_len) = {
            let ledger = ledger.lock().expect("mutex poisoned");
            if ledger.peers.is_empty() {
                debug!("CONSENSUS - no peers known, keeping local chain");
                return (false, ledger.chain.clone());
            }
            (ledger.peers.list(), ledger.len())
        };
        debug!(
            "CONSENSUS - polling {} peers (local length={})",
            peers.len(),
            local_len
        );

        let best = self.longest_valid_chain(&peers, local_len).await;

        let mut ledger = ledger.lock().expect("mutex poisoned");
        let replaced = match best {
            Some((peer, chain)) => {
                let len = chain.len();
                let swapped = ledger.replace_chain(chain);
                if swapped {
                    info!("CONSENSUS - adopted chain of {} blocks from {}", len, peer);
                } else {
                    debug!("CONSENSUS - candidate from {} no longer longer than local", peer);
                }
                swapped
            }
            None => false,
        };
        (replaced, ledger.chain.clone())
    }

    /// Scan `peers` and return the strictly longest valid chain above
    /// `local_len`. Failures of individual peers are logged and skipped.
    /// Results are compared in peer order, so on a tie the earlier peer wins.
    pub async fn longest_valid_chain(
        &self,
        peers: &[String],
        local_len: usize,
    ) -> Option<(String, Vec<Block>)> {
        let fetched: Vec<(String, Result<Vec<Block>>)> = stream::iter(peers.iter().cloned())
            .map(|peer| async move {
                let result = self.fetcher.fetch_chain(&peer).await;
                (peer, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut best_len = local_len;
        let mut best = None;
        for (peer, result) in fetched {
            let chain = match result {
                Ok(chain) => chain,
                Err(e) => {
                    warn!("CONSENSUS - skipping peer {}: {}", peer, e);
                    continue;
                }
            };
            if chain.len() <= best_len {
                debug!(
                    "CONSENSUS - peer {} has {} blocks, not longer than {}",
                    peer,
                    chain.len(),
                    best_len
                );
                continue;
            }
            if let Err(e) = validator::validate(&chain) {
                warn!("CONSENSUS - rejecting chain from {}: {}", peer, e);
                continue;
            }
            best_len = chain.len();
            best = Some((peer, chain));
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, HttpServer, web};
    use std::collections::HashMap;

    /// Peers served from memory; missing entries are unreachable.
    struct StaticFetcher {
        chains: HashMap<String, Vec<Block>>,
    }

    impl ChainFetcher for StaticFetcher {
        async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>> {
            self.chains.get(peer).cloned().ok_or_else(|| {
                Error::UnreachablePeer(peer.to_string(), "connection refused".into())
            })
        }
    }

    fn mined(blocks: usize) -> Vec<Block> {
        let mut ledger = Ledger::new();
        for _ in 1..blocks {
            ledger.mine_next("peer", "miner", 1.0).unwrap();
        }
        ledger.chain
    }

    fn resolver(chains: Vec<(&str, Vec<Block>)>) -> ConsensusResolver<StaticFetcher> {
        let chains = chains
            .into_iter()
            .map(|(peer, chain)| (peer.to_string(), chain))
            .collect();
        ConsensusResolver::new(StaticFetcher { chains }, 2)
    }

    fn ledger_with_peers(blocks: usize, peers: &[&str]) -> Mutex<Ledger> {
        let mut ledger = Ledger::new();
        for _ in 1..blocks {
            ledger.mine_next("local", "miner", 1.0).unwrap();
        }
        for peer in peers {
            ledger.add_peer(peer).unwrap();
        }
        Mutex::new(ledger)
    }

    #[actix_web::test]
    async fn adopts_longer_valid_peer_chain() {
        let b_chain = mined(5);
        let resolver = resolver(vec![("http://node-b:5000", b_chain.clone())]);
        let ledger = ledger_with_peers(3, &["http://node-b:5000"]);

        let (replaced, chain) = resolver.resolve(&ledger).await;

        assert!(replaced);
        assert_eq!(chain, b_chain);
        assert_eq!(ledger.lock().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn keeps_local_chain_on_tie_or_shorter() {
        let resolver = resolver(vec![
            ("http://equal:1", mined(3)),
            ("http://short:1", mined(2)),
        ]);
        let ledger = ledger_with_peers(3, &["http://equal:1", "http://short:1"]);
        let before = ledger.lock().unwrap().chain.clone();

        let (replaced, chain) = resolver.resolve(&ledger).await;

        assert!(!replaced);
        assert_eq!(chain, before);
    }

    #[actix_web::test]
    async fn rejects_longer_invalid_chain() {
        let mut forged = mined(4);
        forged[3].previous_hash = "forged".into();
        let resolver = resolver(vec![("http://evil:1", forged)]);
        let ledger = ledger_with_peers(2, &["http://evil:1"]);

        let (replaced, chain) = resolver.resolve(&ledger).await;

        assert!(!replaced);
        assert_eq!(chain.len(), 2);
    }

    #[actix_web::test]
    async fn unreachable_peer_does_not_block_others() {
        let longest = mined(4);
        let resolver = resolver(vec![("http://up:1", longest.clone())]);
        let ledger = ledger_with_peers(1, &["http://down:1", "http://up:1"]);

        let (replaced, chain) = resolver.resolve(&ledger).await;

        assert!(replaced);
        assert_eq!(chain, longest);
    }

    #[actix_web::test]
    async fn picks_longest_among_valid_peers() {
        let four = mined(4);
        let three = mined(3);
        let resolver = resolver(vec![("http://a:1", three), ("http://b:1", four.clone())]);
        let peers = vec!["http://a:1".to_string(), "http://b:1".to_string()];

        let (peer, chain) = resolver.longest_valid_chain(&peers, 2).await.unwrap();

        assert_eq!(peer, "http://b:1");
        assert_eq!(chain, four);
    }

    #[actix_web::test]
    async fn no_peers_means_no_replacement() {
        let resolver = resolver(vec![]);
        let ledger = ledger_with_peers(2, &[]);
        let (replaced, chain) = resolver.resolve(&ledger).await;
        assert!(!replaced);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn peer_chain_length_must_match() {
        let payload = PeerChain {
            chain: mined(1),
            length: 7,
        };
        assert!(matches!(
            payload.into_chain("http://p:1"),
            Err(Error::MalformedPeerResponse(..))
        ));

        let empty = PeerChain {
            chain: vec![],
            length: 0,
        };
        assert!(empty.into_chain("http://p:1").is_err());
    }

    /// Serve `handler` on the chain export path of a fresh local port and
    /// return the peer identity.
    fn serve_peer<F, Fut>(handler: F) -> String
    where
        F: Fn() -> Fut + Clone + Send + 'static,
        Fut: std::future::Future<Output = HttpResponse> + 'static,
    {
        let server = HttpServer::new(move || {
            App::new().route(CHAIN_EXPORT_PATH, web::get().to(handler.clone()))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind local peer");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}")
    }

    fn export(chain: &[Block]) -> String {
        serde_json::json!({ "chain": chain, "length": chain.len() }).to_string()
    }

    fn serve_chain(chain: &[Block], delay: Duration) -> String {
        let body = export(chain);
        serve_peer(move || {
            let body = body.clone();
            async move {
                actix_web::rt::time::sleep(delay).await;
                HttpResponse::Ok()
                    .content_type("application/json")
                    .body(body)
            }
        })
    }

    struct HttpPeers {
        good: String,
        failing: String,
        garbage: String,
        slow: String,
    }

    const PEER_TIMEOUT: Duration = Duration::from_millis(300);

    /// One healthy peer, one answering 500, one sending an undecodable body
    /// and one with a longer chain that answers after the fetch timeout.
    fn spawn_http_peers(good_chain: &[Block], slow_chain: &[Block]) -> HttpPeers {
        HttpPeers {
            good: serve_chain(good_chain, Duration::ZERO),
            failing: serve_peer(|| async { HttpResponse::InternalServerError().finish() }),
            garbage: serve_peer(|| async {
                HttpResponse::Ok()
                    .content_type("application/json")
                    .body(r#"{"chain": [oops"#)
            }),
            slow: serve_chain(slow_chain, PEER_TIMEOUT * 4),
        }
    }

    #[actix_web::test]
    async fn http_fetcher_classifies_peer_failures() {
        let good_chain = mined(3);
        let peers = spawn_http_peers(&good_chain, &mined(2));
        let fetcher = HttpChainFetcher::new(PEER_TIMEOUT).unwrap();

        assert_eq!(fetcher.fetch_chain(&peers.good).await.unwrap(), good_chain);
        assert!(matches!(
            fetcher.fetch_chain(&peers.failing).await,
            Err(Error::MalformedPeerResponse(..))
        ));
        assert!(matches!(
            fetcher.fetch_chain(&peers.garbage).await,
            Err(Error::MalformedPeerResponse(..))
        ));
        assert!(matches!(
            fetcher.fetch_chain(&peers.slow).await,
            Err(Error::UnreachablePeer(..))
        ));
    }

    #[actix_web::test]
    async fn resolve_over_http_skips_failing_peers() {
        let good_chain = mined(3);
        let peers = spawn_http_peers(&good_chain, &mined(4));
        let resolver = ConsensusResolver::new(HttpChainFetcher::new(PEER_TIMEOUT).unwrap(), 4);
        let ledger = ledger_with_peers(
            2,
            &[
                peers.good.as_str(),
                peers.failing.as_str(),
                peers.garbage.as_str(),
                peers.slow.as_str(),
            ],
        );

        let (replaced, chain) = resolver.resolve(&ledger).await;

        assert!(replaced);
        assert_eq!(chain, good_chain);
        assert_eq!(ledger.lock().unwrap().chain, good_chain);
    }
}
