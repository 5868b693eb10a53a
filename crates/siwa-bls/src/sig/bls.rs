use crate::group::{Element, PairingCurve, Point};
use crate::sig::{Scheme, SignatureScheme};
use std::{fmt::Debug, marker::PhantomData};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BLSError {
    /// The pairing equation does not hold.
    #[error("invalid signature")]
    InvalidSig,

    #[error("could not hash to curve")]
    HashingError,

    #[error("could not (de)serialize: {0}")]
    SerializationError(#[from] bincode::Error),
}

// private module so the helper trait does not leak into the public API
// see https://github.com/rust-lang/rust/issues/34537
mod common {
    use super::*;

    /// Sign and verify are the same for both group assignments, only the
    /// pairing equation differs.
    pub trait BLSScheme: Scheme {
        fn hash(msg: &[u8]) -> Result<Self::Signature, BLSError> {
            let mut h = Self::Signature::new();
            h.map(msg).map_err(|_| BLSError::HashingError)?;
            Ok(h)
        }

        /// Checks `e(sig, g) == e(H(m), public)` in the right group order.
        fn final_exp(p: &Self::Public, sig: &Self::Signature, hm: &Self::Signature) -> bool;
    }

    impl<T> SignatureScheme for T
    where
        T: BLSScheme,
    {
        type Error = BLSError;

        fn sign(private: &Self::Private, msg: &[u8]) -> Result<Vec<u8>, BLSError> {
            let mut h = T::hash(msg)?;
            h.mul(private);
            Ok(bincode::serialize(&h)?)
        }

        fn verify(public: &Self::Public, msg: &[u8], sig: &[u8]) -> Result<(), BLSError> {
            let sig: Self::Signature = bincode::deserialize(sig)?;
            let h = T::hash(msg)?;
            if T::final_exp(public, &sig, &h) {
                Ok(())
            } else {
                Err(BLSError::InvalidSig)
            }
        }
    }
}

/// Public keys on G1, signatures on G2.
#[derive(Clone, Debug)]
pub struct G1Scheme<C: PairingCurve> {
    m: PhantomData<C>,
}

impl<C: PairingCurve> Scheme for G1Scheme<C> {
    type Private = C::Scalar;
    type Public = C::G1;
    type Signature = C::G2;
}

impl<C: PairingCurve> common::BLSScheme for G1Scheme<C> {
    fn final_exp(p: &Self::Public, sig: &Self::Signature, hm: &Self::Signature) -> bool {
        // e(g1, x H(m)) == e(x g1, H(m))
        C::pair(&C::G1::one(), sig) == C::pair(p, hm)
    }
}

/// Public keys on G2, signatures on G1.
#[derive(Clone, Debug)]
pub struct G2Scheme<C: PairingCurve> {
    m: PhantomData<C>,
}

impl<C: PairingCurve> Scheme for G2Scheme<C> {
    type Private = C::Scalar;
    type Public = C::G2;
    type Signature = C::G1;
}

impl<C: PairingCurve> common::BLSScheme for G2Scheme<C> {
    fn final_exp(p: &Self::Public, sig: &Self::Signature, hm: &Self::Signature) -> bool {
        // e(x H(m), g2) == e(H(m), x g2)
        C::pair(sig, &C::G2::one()) == C::pair(hm, p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::bls12381::PairingCurve as PCurve;
    use rand::prelude::*;

    fn sign_and_verify<S: SignatureScheme>() {
        let (private, public) = S::keypair(&mut thread_rng());
        let msg = vec![1, 9, 6, 9];
        let sig = S::sign(&private, &msg).unwrap();
        S::verify(&public, &msg, &sig).unwrap();

        // another message
        S::verify(&public, b"other", &sig).unwrap_err();
        // another key
        let (_, other) = S::keypair(&mut thread_rng());
        S::verify(&other, &msg, &sig).unwrap_err();
        // garbage
        S::verify(&public, &msg, &[1, 2, 3]).unwrap_err();
    }

    #[test]
    fn bls_g1() {
        sign_and_verify::<G1Scheme<PCurve>>();
    }

    #[test]
    fn bls_g2() {
        sign_and_verify::<G2Scheme<PCurve>>();
    }

    #[test]
    fn signing_is_deterministic() {
        type S = G2Scheme<PCurve>;
        let (private, _) = S::keypair(&mut thread_rng());
        assert_eq!(
            S::sign(&private, b"k1").unwrap(),
            S::sign(&private, b"k1").unwrap()
        );
    }
}
