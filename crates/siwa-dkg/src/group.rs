use crate::errors::{DKGError, DKGResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use siwa_bls::{group::Curve, poly::Idx};

/// Digest identifying one (public key vector, threshold) configuration
pub type SessionId = [u8; 32];

/// A participant identified by its index and its long-term public key.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct Node<C: Curve>(Idx, C::Point);

impl<C: Curve> Node<C> {
    pub fn new(index: Idx, public: C::Point) -> Self {
        Self(index, public)
    }

    pub fn id(&self) -> Idx {
        self.0
    }

    pub fn key(&self) -> &C::Point {
        &self.1
    }
}

/// The smallest majority of `n` participants, `floor(n/2) + 1`.
pub fn minimum_threshold(n: usize) -> usize {
    n / 2 + 1
}

/// An ordered set of nodes with the threshold the DKG runs under. All the
/// participants of a session must agree on an identical group.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct Group<C: Curve> {
    pub nodes: Vec<Node<C>>,
    pub threshold: usize,
}

impl<C: Curve> Group<C> {
    /// Valid groups index their nodes `0..n` in order and have
    /// `1 <= threshold <= n`.
    pub fn new(nodes: Vec<Node<C>>, threshold: usize) -> DKGResult<Self> {
        let group = Self { nodes, threshold };
        group.check()?;
        Ok(group)
    }

    /// Checks the invariants `new` enforces, for groups built field by field
    /// or deserialized.
    pub fn check(&self) -> DKGResult<()> {
        if let Some((pos, node)) = self
            .nodes
            .iter()
            .enumerate()
            .find(|(pos, node)| node.id() as usize != *pos)
        {
            return Err(DKGError::InvalidIndex(pos, node.id()));
        }
        if self.threshold < 1 || self.threshold > self.nodes.len() {
            return Err(DKGError::InvalidThreshold(self.threshold, 1, self.nodes.len()));
        }
        Ok(())
    }

    /// Indexes the keys by their position.
    pub fn from_keys(keys: Vec<C::Point>, threshold: usize) -> DKGResult<Self> {
        let nodes = keys
            .into_iter()
            .enumerate()
            .map(|(i, public)| Node::new(i as Idx, public))
            .collect();
        Self::new(nodes, threshold)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets the index of the node holding the provided public key
    pub fn index(&self, public: &C::Point) -> Option<Idx> {
        self.nodes.iter().find(|n| &n.1 == public).map(|n| n.0)
    }

    pub fn contains_index(&self, idx: Idx) -> bool {
        self.nodes.iter().any(|n| n.0 == idx)
    }

    pub fn key(&self, idx: Idx) -> Option<&C::Point> {
        self.nodes.iter().find(|n| n.0 == idx).map(|n| &n.1)
    }

    /// SHA-256 over the ordered public keys and the threshold. Two sessions
    /// can only exchange payloads if their ids are equal.
    pub fn session_id(&self) -> DKGResult<SessionId> {
        let mut buf = Vec::new();
        for node in &self.nodes {
            buf.extend_from_slice(&node.0.to_le_bytes());
            buf.extend(bincode::serialize(&node.1)?);
        }
        buf.extend_from_slice(&(self.threshold as u64).to_le_bytes());

        let mut id = [0u8; 32];
        id.copy_from_slice(&Sha256::digest(&buf));
        Ok(id)
    }
}
