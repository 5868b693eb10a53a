use crate::group::{Element, Point, Scalar};
use crate::poly::{Idx, Poly};
use crate::sig::Share;
use rand_core::RngCore;
use std::{error::Error, fmt::Debug};

/// The groups a signature scheme works over and the way to derive a key pair.
pub trait Scheme: Debug {
    /// Field of the private keys
    type Private: Scalar<RHS = Self::Private>;
    /// Group of the public keys
    type Public: Point<RHS = Self::Private>;
    /// Group of the signatures
    type Signature: Point<RHS = Self::Private>;

    fn keypair<R: RngCore>(rng: &mut R) -> (Self::Private, Self::Public) {
        let private = Self::Private::rand(rng);
        let mut public = Self::Public::one();
        public.mul(&private);
        (private, public)
    }
}

/// Plain signatures. The encoding of the signature bytes is owned by the
/// scheme.
///
/// ```
/// use rand::thread_rng;
/// use siwa_bls::schemes::bls12_381::G2Scheme;
/// use siwa_bls::sig::{Scheme, SignatureScheme};
///
/// let (private, public) = G2Scheme::keypair(&mut thread_rng());
/// let sig = G2Scheme::sign(&private, b"hello").unwrap();
/// G2Scheme::verify(&public, b"hello", &sig).unwrap();
/// ```
pub trait SignatureScheme: Scheme {
    type Error: Error;

    fn sign(private: &Self::Private, msg: &[u8]) -> Result<Vec<u8>, Self::Error>;

    fn verify(public: &Self::Public, msg: &[u8], sig: &[u8]) -> Result<(), Self::Error>;
}

/// An encoded partial signature, tagged with the index of its signer.
pub type Partial = Vec<u8>;

/// A `t`-of-`n` signature scheme: any `t` holders of a share produce partial
/// signatures which aggregate into a regular signature under the distributed
/// public key.
pub trait ThresholdScheme: Scheme {
    type Error: Error;

    fn partial_sign(private: &Share<Self::Private>, msg: &[u8]) -> Result<Partial, Self::Error>;

    /// Checks a partial signature against the public share of its index.
    fn partial_verify(
        public: &Poly<Self::Public>,
        msg: &[u8],
        partial: &[u8],
    ) -> Result<(), Self::Error>;

    /// Returns the signer index encoded in a partial signature.
    fn partial_index(partial: &[u8]) -> Result<Idx, Self::Error>;

    /// Interpolates the partials into a signature. Partials are not verified
    /// here.
    fn aggregate(threshold: usize, partials: &[Partial]) -> Result<Vec<u8>, Self::Error>;

    fn verify(public: &Self::Public, msg: &[u8], sig: &[u8]) -> Result<(), Self::Error>;
}
