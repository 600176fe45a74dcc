pub mod consensus;
pub mod peers;

pub use consensus::{ConsensusResolver, HttpChainFetcher};
pub use peers::PeerSet;

/// Path every node serves its chain on, appended to a peer identity.
pub const CHAIN_EXPORT_PATH: &str = "/api/v1/chain/";
