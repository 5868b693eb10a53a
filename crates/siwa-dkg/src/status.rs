use bitvec::{prelude::*, vec::BitVec};
use serde::{Deserialize, Serialize};
use siwa_bls::poly::Idx;
use std::fmt;

/// A verifier's claim about the deal it received.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub enum Status {
    Success,
    Complaint,
}

impl From<bool> for Status {
    fn from(b: bool) -> Self {
        if b {
            Status::Success
        } else {
            Status::Complaint
        }
    }
}

impl Status {
    pub fn is_success(self) -> bool {
        match self {
            Status::Success => true,
            Status::Complaint => false,
        }
    }
}

/// Dealer × verifier approvals backed by [`bitvec`]. The diagonal is always
/// set: a dealer approves its own deal.
///
/// [`bitvec`]: http://docs.rs/bitvec/0.17.4/
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub struct StatusMatrix(Vec<BitVec>);

impl fmt::Display for StatusMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (dealer, verifiers) in self.0.iter().enumerate() {
            writeln!(f, "-> dealer {}: {}", dealer, verifiers)?;
        }
        Ok(())
    }
}

impl StatusMatrix {
    /// A `n`×`n` matrix with only the diagonal approved.
    pub fn new(n: usize) -> Self {
        let mut rows = (0..n).map(|_| bitvec![0; n]).collect::<Vec<BitVec>>();
        for (i, row) in rows.iter_mut().enumerate() {
            row.set(i, true);
        }
        Self(rows)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Out of range cells are left alone.
    pub fn set(&mut self, dealer: Idx, verifier: Idx, status: Status) {
        if let Some(row) = self.0.get_mut(dealer as usize) {
            if (verifier as usize) < row.len() {
                row.set(verifier as usize, status.is_success());
            }
        }
    }

    /// Out of range cells read as complaints.
    pub fn get(&self, dealer: Idx, verifier: Idx) -> Status {
        self.0
            .get(dealer as usize)
            .and_then(|row| row.get(verifier as usize))
            .map(|b| Status::from(*b))
            .unwrap_or(Status::Complaint)
    }

    /// Number of verifiers that approved `dealer`'s deal.
    pub fn approvals(&self, dealer: Idx) -> usize {
        self.0
            .get(dealer as usize)
            .map(|row| row.iter().filter(|b| **b).count())
            .unwrap_or(0)
    }

    /// `true` once every dealer gathered at least `threshold` approvals.
    pub fn all_approved(&self, threshold: usize) -> bool {
        (0..self.0.len()).all(|d| self.approvals(d as Idx) >= threshold)
    }
}
