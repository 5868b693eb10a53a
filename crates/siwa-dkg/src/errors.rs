use crate::session::SessionState;
use siwa_bls::{ecies::EciesError, poly::Idx};
use thiserror::Error;

/// Result type alias which returns `DKGError`
pub type DKGResult<A> = Result<A, DKGError>;

/// Errors which may occur during the DKG
#[derive(Debug, Error)]
pub enum DKGError {
    /// The private key given to the session does not yield a public key of the
    /// group.
    #[error("public key not found in list of participants")]
    PublicKeyNotFound,

    #[error("threshold {0} is not in range [{1},{2}]")]
    InvalidThreshold(usize, usize, usize),

    /// Nodes must be indexed `0..n` in order.
    #[error("node at position {0} has index {1}")]
    InvalidIndex(usize, Idx),

    /// The payload was produced for another (public key vector, threshold)
    /// configuration.
    #[error("payload belongs to another session")]
    SessionMismatch,

    #[error("deal for share {0} delivered to participant {1}")]
    WrongRecipient(Idx, Idx),

    #[error("invalid dealer index {0}")]
    InvalidDealer(Idx),

    #[error("invalid verifier index {0}")]
    InvalidVerifier(Idx),

    #[error("deal from dealer {0} was already processed")]
    DuplicateDeal(Idx),

    /// A verifier disapproved a deal. The session can no longer certify.
    #[error("verifier {1} complained about the deal of dealer {0}")]
    Complaint(Idx, Idx),

    #[error("operation not allowed in state {0:?}")]
    InvalidState(SessionState),

    #[error("session is not certified")]
    NotCertified,

    #[error("session lock poisoned")]
    Poisoned,

    #[error("de(serialization) failed: {0}")]
    BincodeError(#[from] bincode::Error),

    #[error("could not encrypt share: {0}")]
    Encryption(#[from] EciesError),
}

/// Reasons for disapproving a deal
#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum ShareError {
    #[error("[dealer: {0}] invalid ciphertext: {1}")]
    InvalidCiphertext(Idx, EciesError),

    #[error("[dealer: {0}] share does not match associated public polynomial")]
    InvalidShare(Idx),

    /// Every public polynomial must have degree `threshold - 1`.
    #[error("[dealer: {0}] polynomial does not have the correct degree, got: {1}, expected {2}")]
    InvalidPublicPolynomial(Idx, usize, usize),

    #[error("[dealer: {0}] share is not a scalar: {1}")]
    Malformed(Idx, bincode::Error),
}
