//! # siwa-bls
//!
//! Curve traits, polynomials, ECIES and (threshold) BLS signatures used by the
//! oracle network. Member keys and DKG commitments live in G2 and
//! signatures in G1, so the scheme in use everywhere is
//! [`schemes::bls12_381::G2Scheme`].
//!
//! ```rust
//! use siwa_bls::{
//!     poly::{Idx, Poly},
//!     schemes::bls12_381::G2Scheme as SigScheme,
//!     sig::{Scheme, Share, ThresholdScheme},
//! };
//!
//! let (n, t) = (5, 3);
//! let private_poly = Poly::<<SigScheme as Scheme>::Private>::new(t - 1);
//! let shares = (0..n as Idx)
//!     .map(|i| private_poly.eval(i))
//!     .map(|e| Share { index: e.index, private: e.value })
//!     .collect::<Vec<_>>();
//! let public_poly = private_poly.commit();
//!
//! let partials = shares
//!     .iter()
//!     .map(|s| SigScheme::partial_sign(s, b"hello").unwrap())
//!     .collect::<Vec<_>>();
//! let sig = SigScheme::aggregate(t, &partials).unwrap();
//! <SigScheme as ThresholdScheme>::verify(public_poly.free_coeff(), b"hello", &sig).unwrap();
//! ```

/// Implementations of the [`group`](group/index.html) traits.
pub mod curve;

/// Elliptic Curve Integrated Encryption Scheme using SHA256 as the Key Derivation
pub mod ecies;

/// Generic traits over prime-field scalars and curve points.
pub mod group;

/// Polynomials for secret sharing: evaluation, commitment and interpolation.
pub mod poly;

/// BLS and threshold BLS signatures.
pub mod sig;

/// Pre-instantiated signature schemes
pub mod schemes {
    use crate::sig::{G1Scheme, G2Scheme};

    /// BLS12-381 Schemes
    pub mod bls12_381 {
        pub use crate::curve::bls12381::PairingCurve;
        pub use crate::curve::bls12381::{G1Curve, G2Curve};

        /// Public Keys on G1, Signatures on G2
        pub type G1Scheme = super::G1Scheme<PairingCurve>;
        /// Public Keys on G2, Signatures on G1
        pub type G2Scheme = super::G2Scheme<PairingCurve>;
    }
}
