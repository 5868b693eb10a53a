//! # siwa-node
//!
//! Membership and signing layer of the oracle network. An [`Orchestrator`]
//! owns the aggregators and their producers, recomputes the threshold on every
//! join or leave and rebuilds the DKG session of every member. Once the
//! sessions certify, each [`Producer`] answers queries with a threshold
//! signature share over the result.

pub mod codec;
pub mod config;
mod error;
pub use error::NodeError;
pub mod network;
pub mod orchestrator;
pub use orchestrator::{Aggregator, Orchestrator};
pub mod producer;
pub use producer::Producer;
pub mod querier;
pub mod registry;
pub mod signature;
pub mod topology;

use siwa_bls::{curve::bls12381, schemes::bls12_381};

/// Member keys and DKG commitments are on G2
pub type KeyCurve = bls12_381::G2Curve;
/// Signatures are on G1
pub type SigScheme = bls12_381::G2Scheme;
pub type PrivateKey = bls12381::Scalar;
pub type PublicKey = bls12381::G2;
pub type SessionHandle = siwa_dkg::SessionHandle<KeyCurve>;
pub use siwa_bls::sig::Partial;
