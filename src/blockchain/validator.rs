use super::{Block, pow};
use crate::error::{ChainFault, Error, Result};

/// Walk the chain in order and check every link and proof.
///
/// Stops at the first failing block and reports its 0-based position.
/// An empty chain is an invariant violation, not a valid chain.
pub fn validate(chain: &[Block]) -> Result<()> {
    if chain.is_empty() {
        return Err(Error::EmptyChain);
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);

        if current.previous_hash != previous.digest() {
            return Err(Error::InvalidChain {
                position: position + 1,
                fault: ChainFault::BrokenLink,
            });
        }

        if !pow::verify(current.proof, previous.proof) {
            return Err(Error::InvalidChain {
                position: position + 1,
                fault: ChainFault::InvalidProof,
            });
        }
    }

    Ok(())
}

pub fn is_valid(chain: &[Block]) -> bool {
    validate(chain).is_ok()
}
