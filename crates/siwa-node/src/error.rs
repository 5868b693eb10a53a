use crate::{querier::QueryError, signature::SignatureError};
use siwa_dkg::DKGError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// Malformed bootstrap record. Only the participant being created is
    /// affected.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("dkg protocol error: {0}")]
    Protocol(#[from] DKGError),

    #[error("unknown member {0}")]
    UnknownMember(String),

    #[error("unknown aggregator {0}")]
    UnknownAggregator(String),

    #[error("member {0} has no dkg session")]
    NoSession(String),

    #[error("public key already registered by {0}")]
    DuplicatePublicKey(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("query failed: {0}")]
    Query(#[from] QueryError),
}
