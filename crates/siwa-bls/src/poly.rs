use crate::group::{Curve, Element, Point, Scalar};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

pub type PrivatePoly<C> = Poly<<C as Curve>::Scalar>;
pub type PublicPoly<C> = Poly<<C as Curve>::Point>;

/// Position of a share; doubles as the DKG index of its holder.
pub type Idx = u32;

/// The evaluation of a polynomial at `index + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eval<A> {
    pub index: Idx,
    pub value: A,
}

impl<A: fmt::Display> fmt::Display for Eval<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{ idx: {}, value: {} }}", self.index, self.value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyError {
    #[error("invalid recovery: only has {0}/{1} shares")]
    InvalidRecovery(usize, usize),
    #[error("could not invert scalar")]
    NoInverse,
}

/// A polynomial whose variable is a scalar and whose coefficients are any
/// element that a scalar can multiply: scalars for private polynomials and
/// points for their commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly<C>(Vec<C>);

impl<C> Poly<C> {
    pub fn degree(&self) -> usize {
        // c_0 + c_1 x + ... + c_d x^d holds d + 1 coefficients
        self.0.len().saturating_sub(1)
    }

    /// Number of shares needed to interpolate this polynomial.
    pub fn threshold(&self) -> usize {
        self.0.len()
    }

    /// The constant term. For a commitment this is the distributed public key.
    pub fn free_coeff(&self) -> &C {
        &self.0[0]
    }
}

impl<C: Element> Poly<C> {
    /// Samples a polynomial of the given degree. The matching sharing
    /// threshold is `degree + 1`.
    pub fn new_from<R: RngCore>(degree: usize, rng: &mut R) -> Self {
        Self((0..=degree).map(|_| C::rand(rng)).collect())
    }

    pub fn new(degree: usize) -> Self {
        Self::new_from(degree, &mut rand::thread_rng())
    }

    /// The polynomial holding a single zero coefficient.
    pub fn zero() -> Self {
        Self(vec![C::zero()])
    }

    fn is_zero(&self) -> bool {
        self.0.iter().all(|c| c == &C::zero())
    }

    /// Coefficient-wise addition; the shorter polynomial is padded with zeros.
    pub fn add(&mut self, other: &Self) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), C::zero());
        }
        self.0.iter_mut().zip(&other.0).for_each(|(a, b)| a.add(b));
    }
}

impl<C> Poly<C>
where
    C: Element,
    C::RHS: Scalar<RHS = C::RHS>,
{
    /// Evaluates at `i + 1`. The point 0 is never used since it is the secret.
    pub fn eval(&self, i: Idx) -> Eval<C> {
        let x = share_point::<C::RHS>(i);

        // Horner
        let value = self.0.iter().rev().fold(C::zero(), |mut acc, coeff| {
            acc.mul(&x);
            acc.add(coeff);
            acc
        });

        Eval { index: i, value }
    }

    /// Interpolates the constant term from at least `t` evaluations with
    /// distinct indices. Repeated indices count once.
    pub fn recover(t: usize, shares: Vec<Eval<C>>) -> Result<C, PolyError> {
        let xs = Self::share_map(t, shares)?;

        let mut acc = C::zero();
        for (i, (xi, yi)) in &xs {
            // l_i(0) = prod_{j != i} x_j / (x_j - x_i)
            let mut num = C::RHS::one();
            let mut den = C::RHS::one();
            for (j, (xj, _)) in &xs {
                if i == j {
                    continue;
                }
                num.mul(xj);
                let mut diff = xj.clone();
                diff.sub(xi);
                den.mul(&diff);
            }

            num.mul(&den.inverse().ok_or(PolyError::NoInverse)?);
            let mut term = yi.clone();
            term.mul(&num);
            acc.add(&term);
        }

        Ok(acc)
    }

    /// Interpolates every coefficient from at least `t` evaluations.
    pub fn full_recover(t: usize, shares: Vec<Eval<C>>) -> Result<Self, PolyError> {
        let xs = Self::share_map(t, shares)?;

        xs.iter().try_fold(Self::zero(), |mut acc, (i, (_, yi))| {
            let basis = Poly::<C::RHS>::lagrange_basis(*i, &xs)?;
            let scaled = basis
                .0
                .iter()
                .map(|c| {
                    let mut term = yi.clone();
                    term.mul(c);
                    term
                })
                .collect::<Vec<_>>();
            acc.add(&Self(scaled));
            Ok(acc)
        })
    }

    // Keeps the `t` lowest distinct indices, keyed with their x coordinate.
    fn share_map(
        t: usize,
        shares: Vec<Eval<C>>,
    ) -> Result<BTreeMap<Idx, (C::RHS, C)>, PolyError> {
        let mut xs = BTreeMap::new();
        for share in shares {
            xs.entry(share.index)
                .or_insert_with(|| (share_point::<C::RHS>(share.index), share.value));
        }

        if xs.len() < t {
            return Err(PolyError::InvalidRecovery(xs.len(), t));
        }

        Ok(xs.into_iter().take(t).collect())
    }
}

fn share_point<S: Scalar>(i: Idx) -> S {
    let mut x = S::new();
    x.set_int(u64::from(i) + 1);
    x
}

impl<C> From<Vec<C>> for Poly<C> {
    fn from(c: Vec<C>) -> Self {
        Self(c)
    }
}

impl<C> From<Poly<C>> for Vec<C> {
    fn from(poly: Poly<C>) -> Self {
        poly.0
    }
}

impl<X: Scalar<RHS = X>> Poly<X> {
    /// Schoolbook product, the result always has degree `d1 + d2`.
    fn mul(&mut self, other: &Self) {
        if self.is_zero() || other.is_zero() {
            *self = Self::zero();
            return;
        }

        let mut coeffs = vec![X::zero(); self.degree() + other.degree() + 1];
        for (i, c1) in self.0.iter().enumerate() {
            for (j, c2) in other.0.iter().enumerate() {
                let mut tmp = c1.clone();
                tmp.mul(c2);
                coeffs[i + j].add(&tmp);
            }
        }
        self.0 = coeffs;
    }

    /// f(x) = x - c
    fn new_neg_constant(mut c: X) -> Self {
        c.negate();
        Self(vec![c, X::one()])
    }

    fn lagrange_basis<E>(i: Idx, xs: &BTreeMap<Idx, (X, E)>) -> Result<Self, PolyError> {
        let xi = match xs.get(&i) {
            Some((x, _)) => x.clone(),
            None => return Err(PolyError::InvalidRecovery(xs.len(), xs.len() + 1)),
        };

        let mut basis = Self(vec![X::one()]);
        let mut den_acc = X::one();
        for (idx, (xj, _)) in xs {
            if *idx == i {
                continue;
            }
            basis.mul(&Self::new_neg_constant(xj.clone()));

            let mut den = xi.clone();
            den.sub(xj);
            den_acc.mul(&den.inverse().ok_or(PolyError::NoInverse)?);
        }

        basis.0.iter_mut().for_each(|c| c.mul(&den_acc));
        Ok(basis)
    }

    /// Multiplies every coefficient with the generator of `P`.
    pub fn commit<P: Point<RHS = X>>(&self) -> Poly<P> {
        Poly(
            self.0
                .iter()
                .map(|c| {
                    let mut commitment = P::one();
                    commitment.mul(c);
                    commitment
                })
                .collect(),
        )
    }
}

impl<C: fmt::Display> fmt::Display for Poly<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let coeffs = self
            .0
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}: {}", i, c))
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "[deg: {}, coeffs: [{}]]", self.degree(), coeffs)
    }
}
