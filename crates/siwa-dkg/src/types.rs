use crate::{group::SessionId, status::Status};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use siwa_bls::{
    ecies::EciesCipher,
    group::Curve,
    poly::{Idx, PublicPoly},
    sig::Share,
};

/// A private share encrypted to `share_idx`, with the dealer's commitment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct Deal<C: Curve> {
    pub session_id: SessionId,
    pub dealer_idx: Idx,
    pub share_idx: Idx,
    pub secret: EciesCipher<C>,
    pub public: PublicPoly<C>,
}

/// A verifier's approval or complaint about one dealer's deal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Response {
    pub session_id: SessionId,
    pub dealer_idx: Idx,
    pub verifier_idx: Idx,
    pub status: Status,
}

/// Output of a certified session: the member's share of the distributed key
/// and the public polynomial committing to it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct DistKeyShare<C: Curve> {
    pub share: Share<C::Scalar>,
    pub public: PublicPoly<C>,
}

impl<C: Curve> DistKeyShare<C> {
    /// The distributed public key
    pub fn public_key(&self) -> &C::Point {
        self.public.free_coeff()
    }
}
