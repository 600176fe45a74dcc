use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use super::DIFFICULTY_PREFIX;
use crate::error::{Error, Result};

/// How many candidates are tried between cancellation checks.
const CANCEL_CHECK_INTERVAL: i64 = 1024;

/// SHA-256 (hex) of `hex(proof² - previous_proof²)`.
///
/// The arithmetic wraps on overflow. A negative difference is encoded as a
/// leading `-` followed by the hex of its magnitude.
pub fn puzzle_digest(proof: i64, previous_proof: i64) -> String {
    let diff = proof
        .wrapping_mul(proof)
        .wrapping_sub(previous_proof.wrapping_mul(previous_proof));
    let encoded = if diff < 0 {
        format!("-{:x}", diff.unsigned_abs())
    } else {
        format!("{:x}", diff)
    };
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    hex::encode(hasher.finalize())
}

/// True iff the puzzle digest starts with the difficulty prefix.
pub fn verify(proof: i64, previous_proof: i64) -> bool {
    puzzle_digest(proof, previous_proof).starts_with(DIFFICULTY_PREFIX)
}

/// Linear search from 1 for the first proof that solves the puzzle.
/// Returns `Error::Cancelled` once `token` is cancelled.
pub fn solve(previous_proof: i64, token: &CancellationToken) -> Result<i64> {
    let mut candidate: i64 = 1;
    loop {
        if candidate % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if verify(candidate, previous_proof) {
            return Ok(candidate);
        }
        candidate = candidate
            .checked_add(1)
            .ok_or(Error::ProofSpaceExhausted(previous_proof))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_difference_is_sign_prefixed() {
        // 1 - 16 = -15 -> "-f"
        let mut hasher = Sha256::new();
        hasher.update(b"-f");
        assert_eq!(puzzle_digest(1, 4), hex::encode(hasher.finalize()));
    }

    #[test]
    fn positive_difference_is_plain_hex() {
        // 16 - 1 = 15 -> "f"
        let mut hasher = Sha256::new();
        hasher.update(b"f");
        assert_eq!(puzzle_digest(4, 1), hex::encode(hasher.finalize()));
    }

    #[test]
    fn solve_returns_first_solution() {
        let token = CancellationToken::new();
        let proof = solve(1, &token).unwrap();
        assert!(verify(proof, 1));
        assert!((1..proof).all(|p| !verify(p, 1)));
        assert!(puzzle_digest(proof, 1).starts_with("0000"));
    }

    #[test]
    fn solve_is_deterministic() {
        let token = CancellationToken::new();
        assert_eq!(solve(7, &token).unwrap(), solve(7, &token).unwrap());
    }

    #[test]
    fn solve_stops_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        // The solution for 1 lies well past the first cancellation check.
        assert!(solve(1, &CancellationToken::new()).unwrap() > CANCEL_CHECK_INTERVAL);
        assert!(matches!(solve(1, &token), Err(Error::Cancelled)));
    }

    #[test]
    fn huge_proofs_do_not_panic() {
        let _ = puzzle_digest(i64::MAX, i64::MIN);
        let _ = verify(i64::MIN, i64::MAX);
    }
}
