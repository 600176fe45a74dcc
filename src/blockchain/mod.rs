pub mod block;
pub mod model;
pub mod pow;
pub mod validator;

pub use block::Block;
pub use model::Ledger;

/// Required hex prefix of a puzzle digest. Fixed, no retargeting.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Amount credited to the miner of each block unless configured otherwise.
pub const DEFAULT_MINING_REWARD: f64 = 1.0;
