use std::collections::BTreeSet;
use url::Url;

use crate::error::{Error, Result};

/// Known peers keyed by a normalized `scheme://host:port` identity.
#[derive(Debug, Default, Clone)]
pub struct PeerSet {
    peers: BTreeSet<String>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self {
            peers: BTreeSet::new(),
        }
    }

    /// Reduce an address to its peer identity. Bare `host:port` is read as http.
    /// Path, query and fragment are dropped.
    pub fn normalize(address: &str) -> Result<String> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidPeerAddress(
                address.to_string(),
                "empty address".into(),
            ));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| Error::InvalidPeerAddress(address.to_string(), e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::InvalidPeerAddress(
                address.to_string(),
                format!("unsupported scheme {}", url.scheme()),
            ));
        }

        let host = url.host_str().ok_or_else(|| {
            Error::InvalidPeerAddress(address.to_string(), "missing host".into())
        })?;
        let port = url.port_or_known_default().ok_or_else(|| {
            Error::InvalidPeerAddress(address.to_string(), "missing port".into())
        })?;

        Ok(format!("{}://{}:{}", url.scheme(), host, port))
    }

    /// Insert an address; returns its identity. Re-adding is a no-op.
    pub fn add(&mut self, address: &str) -> Result<String> {
        let identity = Self::normalize(address)?;
        self.peers.insert(identity.clone());
        Ok(identity)
    }

    pub fn contains(&self, address: &str) -> bool {
        Self::normalize(address)
            .map(|id| self.peers.contains(&id))
            .unwrap_or(false)
    }

    /// Identities in stable (sorted) order.
    pub fn list(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
