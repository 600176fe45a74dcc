use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a block failed chain validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("previous_hash does not match the digest of the previous block")]
    BrokenLink,
    #[error("proof does not solve the puzzle against the previous proof")]
    InvalidProof,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Invalid peer address {0}: {1}")]
    InvalidPeerAddress(String, String),
    #[error("Peer {0} unreachable: {1}")]
    UnreachablePeer(String, String),
    #[error("Peer {0} sent a malformed chain: {1}")]
    MalformedPeerResponse(String, String),
    #[error("Invalid chain at position {position}: {fault}")]
    InvalidChain { position: usize, fault: ChainFault },
    #[error("Invariant violation: chain is empty")]
    EmptyChain,
    #[error("Chain tip moved while mining")]
    StaleTip,
    #[error("Proof-of-work search cancelled")]
    Cancelled,
    #[error("No proof below i64::MAX solves the puzzle for previous proof {0}")]
    ProofSpaceExhausted(i64),
    #[error("Proof-of-work search timed out after {0:?}")]
    MiningTimeout(Duration),
    #[error("Blocking task failed: {0}")]
    Blocking(String),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::MalformedInput(_) | Error::InvalidPeerAddress(..) => StatusCode::BAD_REQUEST,
            Error::StaleTip => StatusCode::CONFLICT,
            Error::Cancelled | Error::MiningTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::UnreachablePeer(..) | Error::MalformedPeerResponse(..) => {
                StatusCode::BAD_GATEWAY
            }
            Error::InvalidChain { .. }
            | Error::EmptyChain
            | Error::Blocking(_)
            | Error::ProofSpaceExhausted(_)
            | Error::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
