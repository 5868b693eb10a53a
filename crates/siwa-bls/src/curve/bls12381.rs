use crate::group::{CurveFrom, Element, PairingCurve as PC, Point, Scalar as Sc};
use ff::{Field, PrimeField};
use groupy::CurveProjective;
use paired::bls12_381::{Bls12, Fq12, Fr, FrRepr, G1 as PG1, G2 as PG2};
use paired::Engine;
use rand_core::RngCore;

pub type Scalar = Fr;
pub type G1 = PG1;
pub type G2 = PG2;
pub type GT = Fq12;

impl Element for Scalar {
    type RHS = Fr;

    fn new() -> Self {
        Field::zero()
    }

    fn one() -> Self {
        Field::one()
    }

    fn add(&mut self, s2: &Self) {
        self.add_assign(s2);
    }

    fn mul(&mut self, mul: &Fr) {
        self.mul_assign(mul)
    }

    fn rand<R: RngCore>(rng: &mut R) -> Self {
        Fr::random(rng)
    }
}

/// Scalar field of BLS12-381
impl Sc for Scalar {
    fn set_int(&mut self, i: u64) {
        *self = Fr::from_repr(FrRepr::from(i)).expect("a u64 is always below the field modulus");
    }

    fn inverse(&self) -> Option<Self> {
        Field::inverse(self)
    }

    fn negate(&mut self) {
        Field::negate(self);
    }

    fn sub(&mut self, other: &Self) {
        self.sub_assign(other);
    }
}

// Both groups share the exact same glue, only the underlying type differs.
macro_rules! impl_group {
    ($group:ident) => {
        impl Element for $group {
            type RHS = Scalar;

            fn new() -> Self {
                CurveProjective::zero()
            }

            fn one() -> Self {
                CurveProjective::one()
            }

            fn add(&mut self, s2: &Self) {
                self.add_assign(s2);
            }

            fn mul(&mut self, mul: &Scalar) {
                self.mul_assign(mul.into_repr())
            }

            fn rand<R: RngCore>(rng: &mut R) -> Self {
                $group::random(rng)
            }
        }

        impl Point for $group {
            type Error = ();

            fn map(&mut self, data: &[u8]) -> Result<(), ()> {
                *self = $group::hash(data);
                Ok(())
            }
        }
    };
}

impl_group!(G1);
impl_group!(G2);

/// Keys on G1
pub type G1Curve = CurveFrom<Scalar, G1>;
/// Keys on G2
pub type G2Curve = CurveFrom<Scalar, G2>;

#[derive(Clone, Debug)]
pub struct PairingCurve;

impl PC for PairingCurve {
    type Scalar = Scalar;
    type G1 = G1;
    type G2 = G2;
    type GT = GT;

    fn pair(a: &Self::G1, b: &Self::G2) -> Self::GT {
        Bls12::pairing(a.into_affine(), b.into_affine())
    }
}
