use log::{debug, info};

use super::{Block, pow, validator};
use crate::error::{Error, Result};
use crate::network::PeerSet;
use crate::transaction::Transaction;

/// In-memory chain, pending transactions and known peers of this node.
#[derive(Debug)]
pub struct Ledger {
    pub chain: Vec<Block>,
    pub pending: Vec<Transaction>,
    pub peers: PeerSet,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Initialize a new ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Self::create_genesis()],
            pending: Vec::new(),
            peers: PeerSet::new(),
        }
    }

    pub fn create_genesis() -> Block {
        Block::genesis()
    }

    /// Return the last block in the chain.
    pub fn previous_block(&self) -> Result<&Block> {
        if self.is_empty() {
            return Err(Error::EmptyChain);
        }
        Ok(&self.chain[self.len() - 1])
    }

    /// The tip's proof and digest, which is all a miner needs to start.
    pub fn tip(&self) -> Result<(i64, String)> {
        let tip = self.previous_block()?;
        Ok((tip.proof, tip.digest()))
    }

    /// Build (but do not append) the next block carrying a snapshot of the
    /// pending transactions.
    pub fn create_block(&self, proof: i64, previous_hash: String) -> Block {
        Block::new(
            self.chain.len() as u64 + 1,
            proof,
            previous_hash,
            self.pending.clone(),
        )
    }

    /// Queue a transaction and return the index of the block it should land in.
    pub fn add_transaction(
        &mut self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
    ) -> Result<u64> {
        let target = self.previous_block()?.index + 1;
        self.pending.push(Transaction::new(sender, receiver, amount));
        debug!(
            "LEDGER - queued tx for block #{} (pending={})",
            target,
            self.pending.len()
        );
        Ok(target)
    }

    /// Register a peer; returns its normalized identity.
    pub fn add_peer(&mut self, address: &str) -> Result<String> {
        self.peers.add(address)
    }

    /// Append the block solved by `proof` on top of `previous_hash`.
    ///
    /// Fails with `StaleTip` if the tip is no longer the one the proof was
    /// searched against. On success the reward is included, the pending pool
    /// is moved into the block and cleared.
    pub fn seal_block(
        &mut self,
        proof: i64,
        previous_hash: String,
        reward: Transaction,
    ) -> Result<&Block> {
        let (tip_proof, tip_hash) = self.tip()?;
        if tip_hash != previous_hash || !pow::verify(proof, tip_proof) {
            return Err(Error::StaleTip);
        }

        self.pending.push(reward);
        let block = self.create_block(proof, previous_hash);
        self.pending.clear();
        self.chain.push(block);

        let sealed = self.previous_block()?;
        info!(
            "LEDGER - appended block #{} (proof={}, txs={})",
            sealed.index,
            sealed.proof,
            sealed.transactions.len()
        );
        Ok(sealed)
    }

    /// Swap in `candidate` if it is strictly longer and valid.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> bool {
        if candidate.len() <= self.chain.len() || !validator::is_valid(&candidate) {
            return false;
        }
        info!(
            "LEDGER - chain replaced ({} -> {} blocks)",
            self.chain.len(),
            candidate.len()
        );
        self.chain = candidate;
        true
    }

    pub fn is_valid(&self) -> Result<()> {
        validator::validate(&self.chain)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Solve and seal the next block synchronously.
    #[cfg(test)]
    pub fn mine_next(&mut self, node_id: &str, miner: &str, reward: f64) -> Result<&Block> {
        let (proof, hash) = self.tip()?;
        let proof = pow::solve(proof, &tokio_util::sync::CancellationToken::new())?;
        self.seal_block(proof, hash, Transaction::new(node_id, miner, reward))
    }
}
