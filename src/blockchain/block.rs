use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::transaction::Transaction;

/// A single block in the chain. Immutable once appended.
///
/// Field order is the canonical encoding used both for hashing and on the
/// wire: `index`, `timestamp`, `proof`, `previous_hash`, `transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,      // 1-based position in the chain
    pub timestamp: i64,  // Unix milliseconds (UTC)
    pub proof: i64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The root block every ledger starts from.
    pub fn genesis() -> Self {
        Self {
            index: 1,
            timestamp: Utc::now().timestamp_millis(),
            proof: 1,
            previous_hash: String::from("0"),
            transactions: Vec::new(),
        }
    }

    pub fn new(
        index: u64,
        proof: i64,
        previous_hash: String,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            index,
            timestamp: Utc::now().timestamp_millis(),
            proof,
            previous_hash,
            transactions,
        }
    }

    /// SHA-256 over the compact JSON encoding of the block, hex encoded.
    pub fn digest(&self) -> String {
        let preimage = serde_json::to_vec(self).expect("block serializes to JSON");
        let mut hasher = Sha256::new();
        hasher.update(&preimage);
        hex::encode(hasher.finalize())
    }
}
