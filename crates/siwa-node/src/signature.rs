//! Threshold signing on top of a certified session.
use crate::{PublicKey, SessionHandle, SigScheme};
use siwa_bls::{
    poly::Idx,
    sig::{Partial, ThresholdError, ThresholdScheme},
};
use siwa_dkg::{DKGError, DistKeyShare};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("session is not certified")]
    NotCertified,

    #[error(transparent)]
    Protocol(DKGError),

    #[error(transparent)]
    Threshold(#[from] ThresholdError<SigScheme>),

    #[error("share from index {0} does not verify")]
    InvalidShare(Idx),

    #[error("only {0}/{1} valid shares")]
    NotEnoughShares(usize, usize),

    #[error("threshold {0} is not in range [1,{1}]")]
    InvalidThreshold(usize, usize),

    #[error("recovered signature does not verify against the group key")]
    InvalidSignature,
}

impl From<DKGError> for SignatureError {
    fn from(err: DKGError) -> Self {
        match err {
            DKGError::NotCertified => SignatureError::NotCertified,
            err => SignatureError::Protocol(err),
        }
    }
}

fn key_share(session: &SessionHandle) -> Result<DistKeyShare<crate::KeyCurve>, SignatureError> {
    Ok(session.key_share()?)
}

/// Signs `message` with the session's share. Deterministic for a given share
/// and message.
pub fn sign(session: &SessionHandle, message: &[u8]) -> Result<Partial, SignatureError> {
    let share = key_share(session)?;
    Ok(SigScheme::partial_sign(&share.share, message)?)
}

/// Checks a single share against the group's public polynomial. Any failure
/// reads as `false`.
pub fn verify(session: &SessionHandle, message: &[u8], partial: &[u8]) -> bool {
    match key_share(session) {
        Ok(share) => SigScheme::partial_verify(&share.public, message, partial).is_ok(),
        Err(err) => {
            debug!(%err, "cannot verify share");
            false
        }
    }
}

/// Rebuilds the group signature over `message`. Every supplied share must
/// verify; shares repeating an index count once.
pub fn recover(
    session: &SessionHandle,
    threshold: usize,
    member_count: usize,
    message: &[u8],
    shares: &[Partial],
) -> Result<Vec<u8>, SignatureError> {
    if threshold == 0 || threshold > member_count {
        return Err(SignatureError::InvalidThreshold(threshold, member_count));
    }
    let dist = key_share(session)?;

    let mut distinct = BTreeMap::new();
    for share in shares {
        let idx = SigScheme::partial_index(share)?;
        if idx as usize >= member_count
            || SigScheme::partial_verify(&dist.public, message, share).is_err()
        {
            return Err(SignatureError::InvalidShare(idx));
        }
        distinct.entry(idx).or_insert_with(|| share.clone());
    }

    if distinct.len() < threshold {
        return Err(SignatureError::NotEnoughShares(distinct.len(), threshold));
    }

    let partials = distinct.into_iter().map(|(_, s)| s).collect::<Vec<_>>();
    let sig = SigScheme::aggregate(threshold, &partials)?;
    <SigScheme as ThresholdScheme>::verify(dist.public_key(), message, &sig)
        .map_err(|_| SignatureError::InvalidSignature)?;
    Ok(sig)
}

/// Checks a recovered signature against the distributed public key.
pub fn verify_signature(session: &SessionHandle, message: &[u8], signature: &[u8]) -> bool {
    key_share(session)
        .map(|dist| {
            <SigScheme as ThresholdScheme>::verify(dist.public_key(), message, signature).is_ok()
        })
        .unwrap_or(false)
}

pub fn distributed_public_key(session: &SessionHandle) -> Result<PublicKey, SignatureError> {
    key_share(session).map(|dist| *dist.public_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{network::run_exchange, KeyCurve};
    use siwa_bls::group::Curve;
    use siwa_dkg::Group;

    fn certified(n: usize, t: usize) -> Vec<SessionHandle> {
        let (privs, pubs): (Vec<_>, Vec<_>) = (0..n)
            .map(|_| KeyCurve::keypair(&mut rand::thread_rng()))
            .unzip();
        let group = Group::from_keys(pubs, t).unwrap();
        let handles = privs
            .into_iter()
            .map(|p| SessionHandle::new(p, group.clone()).unwrap())
            .collect::<Vec<_>>();
        run_exchange(&handles).unwrap();
        handles
    }

    #[test]
    fn sign_then_verify() {
        let handles = certified(3, 2);
        let share = sign(&handles[0], b"v1").unwrap();
        assert_eq!(share, sign(&handles[0], b"v1").unwrap());
        assert!(verify(&handles[1], b"v1", &share));
        assert!(!verify(&handles[1], b"v2", &share));
        assert!(!verify(&handles[1], b"v1", &[0, 1, 2]));
    }

    #[test]
    fn uncertified_session_cannot_sign() {
        let (p, public) = KeyCurve::keypair(&mut rand::thread_rng());
        let (_, other) = KeyCurve::keypair(&mut rand::thread_rng());
        let group = Group::from_keys(vec![public, other], 2).unwrap();
        let session = SessionHandle::new(p, group).unwrap();

        match sign(&session, b"v1").unwrap_err() {
            SignatureError::NotCertified => {}
            e => panic!("unexpected error {}", e),
        }
        assert!(!verify(&session, b"v1", &[]));
        assert!(!verify_signature(&session, b"v1", &[]));
        distributed_public_key(&session).unwrap_err();
    }

    #[test]
    fn recover_with_threshold_shares() {
        let handles = certified(4, 3);
        let shares = handles
            .iter()
            .map(|h| sign(h, b"v1").unwrap())
            .collect::<Vec<_>>();

        let sig = recover(&handles[2], 3, 4, b"v1", &shares[1..]).unwrap();
        assert!(!sig.is_empty());
        assert!(verify_signature(&handles[0], b"v1", &sig));
        assert!(!verify_signature(&handles[0], b"v2", &sig));

        // any subset works and gives the same signature
        let again = recover(&handles[0], 3, 4, b"v1", &shares[..3]).unwrap();
        assert_eq!(sig, again);
    }

    #[test]
    fn recover_fails_below_threshold() {
        let handles = certified(4, 3);
        let share0 = sign(&handles[0], b"v1").unwrap();
        let share1 = sign(&handles[1], b"v1").unwrap();

        // duplicates do not count twice
        let shares = vec![share0.clone(), share1, share0];
        match recover(&handles[0], 3, 4, b"v1", &shares).unwrap_err() {
            SignatureError::NotEnoughShares(2, 3) => {}
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn recover_fails_on_mixed_messages() {
        let handles = certified(4, 3);
        let mut shares = handles[..3]
            .iter()
            .map(|h| sign(h, b"v1").unwrap())
            .collect::<Vec<_>>();
        shares.push(sign(&handles[3], b"v2").unwrap());

        match recover(&handles[0], 3, 4, b"v1", &shares).unwrap_err() {
            SignatureError::InvalidShare(3) => {}
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn recover_rejects_bad_threshold() {
        let handles = certified(3, 2);
        recover(&handles[0], 0, 3, b"v1", &[]).unwrap_err();
        recover(&handles[0], 4, 3, b"v1", &[]).unwrap_err();
    }
}
