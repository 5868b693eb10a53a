//! Threshold signatures on top of any plain signature scheme
use crate::poly::{Eval, Idx, Poly, PolyError};
use crate::sig::{Partial, SignatureScheme, ThresholdScheme};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A private share of a distributed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share<S> {
    pub index: Idx,
    pub private: S,
}

#[derive(Debug, Error)]
pub enum ThresholdError<I: SignatureScheme> {
    #[error("could not recover the signature: {0}")]
    PolyError(PolyError),

    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    #[error("signing error: {0}")]
    SignatureError(I::Error),

    #[error("not enough partial signatures: {0}/{1}")]
    NotEnoughPartialSignatures(usize, usize),
}

impl<I: SignatureScheme> ThresholdScheme for I {
    type Error = ThresholdError<I>;

    fn partial_sign(private: &Share<Self::Private>, msg: &[u8]) -> Result<Partial, ThresholdError<I>> {
        let sig = I::sign(&private.private, msg).map_err(ThresholdError::SignatureError)?;
        let partial = Eval {
            index: private.index,
            value: sig,
        };
        Ok(bincode::serialize(&partial)?)
    }

    fn partial_verify(
        public: &Poly<Self::Public>,
        msg: &[u8],
        partial: &[u8],
    ) -> Result<(), ThresholdError<I>> {
        let partial: Eval<Vec<u8>> = bincode::deserialize(partial)?;
        let public_i = public.eval(partial.index);
        <I as SignatureScheme>::verify(&public_i.value, msg, &partial.value)
            .map_err(ThresholdError::SignatureError)
    }

    fn partial_index(partial: &[u8]) -> Result<Idx, ThresholdError<I>> {
        let partial: Eval<Vec<u8>> = bincode::deserialize(partial)?;
        Ok(partial.index)
    }

    fn aggregate(threshold: usize, partials: &[Partial]) -> Result<Vec<u8>, ThresholdError<I>> {
        if threshold > partials.len() {
            return Err(ThresholdError::NotEnoughPartialSignatures(
                partials.len(),
                threshold,
            ));
        }

        let evals = partials
            .iter()
            .map(|partial| {
                let eval: Eval<Vec<u8>> = bincode::deserialize(partial)?;
                Ok(Eval {
                    index: eval.index,
                    value: bincode::deserialize::<Self::Signature>(&eval.value)?,
                })
            })
            .collect::<Result<Vec<_>, ThresholdError<I>>>()?;

        let sig = Poly::<Self::Signature>::recover(threshold, evals)
            .map_err(ThresholdError::PolyError)?;
        Ok(bincode::serialize(&sig)?)
    }

    fn verify(public: &Self::Public, msg: &[u8], sig: &[u8]) -> Result<(), ThresholdError<I>> {
        <I as SignatureScheme>::verify(public, msg, sig).map_err(ThresholdError::SignatureError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        curve::bls12381::PairingCurve as PCurve,
        sig::{G1Scheme, G2Scheme, Scheme},
    };
    use proptest::prelude::*;

    fn shares<T: ThresholdScheme>(n: usize, t: usize) -> (Vec<Share<T::Private>>, Poly<T::Public>) {
        let private = Poly::<T::Private>::new(t - 1);
        let shares = (0..n as Idx)
            .map(|i| private.eval(i))
            .map(|e| Share {
                index: e.index,
                private: e.value,
            })
            .collect();
        (shares, private.commit())
    }

    fn threshold_round<T: ThresholdScheme>(n: usize, t: usize) {
        let (shares, public) = shares::<T>(n, t);
        let msg = vec![1, 9, 6, 9];

        let partials: Vec<_> = shares
            .iter()
            .map(|s| T::partial_sign(s, &msg).unwrap())
            .collect();

        for (i, p) in partials.iter().enumerate() {
            T::partial_verify(&public, &msg, p).unwrap();
            assert_eq!(T::partial_index(p).unwrap(), i as Idx);
        }

        let sig = T::aggregate(t, &partials).unwrap();
        <T as ThresholdScheme>::verify(public.free_coeff(), &msg, &sig).unwrap();
    }

    #[test]
    fn threshold_g1() {
        threshold_round::<G1Scheme<PCurve>>(5, 4);
    }

    #[test]
    fn threshold_g2() {
        threshold_round::<G2Scheme<PCurve>>(5, 3);
    }

    #[test]
    fn partial_on_other_message_fails() {
        type S = G2Scheme<PCurve>;
        let (shares, public) = shares::<S>(3, 2);
        let partial = S::partial_sign(&shares[0], b"k1").unwrap();
        S::partial_verify(&public, b"k2", &partial).unwrap_err();
    }

    #[test]
    fn aggregate_needs_threshold() {
        type S = G2Scheme<PCurve>;
        let (shares, _) = shares::<S>(4, 3);
        let partials = shares[..2]
            .iter()
            .map(|s| S::partial_sign(s, b"k1").unwrap())
            .collect::<Vec<_>>();
        match S::aggregate(3, &partials).unwrap_err() {
            ThresholdError::NotEnoughPartialSignatures(2, 3) => {}
            e => panic!("unexpected error {}", e),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(4))]

        #[test]
        fn any_subset_of_threshold_size_recovers(n in 2..6usize, skip in 0..6usize) {
            type S = G2Scheme<PCurve>;
            let t = n / 2 + 1;
            let (shares, public) = shares::<S>(n, t);
            let partials = shares
                .iter()
                .cycle()
                .skip(skip % n)
                .take(t)
                .map(|s| S::partial_sign(s, b"k1").unwrap())
                .collect::<Vec<_>>();
            let sig = S::aggregate(t, &partials).unwrap();
            prop_assert!(<S as ThresholdScheme>::verify(public.free_coeff(), b"k1", &sig).is_ok());
        }
    }
}
