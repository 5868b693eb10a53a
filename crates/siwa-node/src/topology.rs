//! Membership and threshold of one aggregator's group.
//!
//! The aggregator always sits at DKG index 0, producers follow ordered by
//! rank. The threshold moves toward the current majority: it only grows on a
//! join and only shrinks on a leave, never below 1.
use crate::{KeyCurve, PublicKey};
use siwa_bls::poly::Idx;
use siwa_dkg::{minimum_threshold, DKGResult, Group};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Member {
    id: String,
    public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    aggregator_id: String,
    aggregator_key: PublicKey,
    /// producers by rank
    members: BTreeMap<u64, Member>,
    threshold: usize,
}

impl Topology {
    pub fn new(aggregator_id: &str, aggregator_key: PublicKey) -> Self {
        Self {
            aggregator_id: aggregator_id.to_string(),
            aggregator_key,
            members: BTreeMap::new(),
            threshold: 1,
        }
    }

    /// Adds a producer and returns the ordered public keys and the threshold
    /// to run the DKG with. Adding a present id, or an id at a rank another
    /// member holds, changes nothing.
    pub fn add_member(&mut self, id: &str, public_key: PublicKey, rank: u64) -> (Vec<PublicKey>, usize) {
        if let Some(holder) = self.members.get(&rank).filter(|m| m.id != id) {
            warn!(aggregator = %self.aggregator_id, member = id, rank, holder = %holder.id, "rank taken, member not added");
        } else if !self.contains(id) {
            self.members.insert(
                rank,
                Member {
                    id: id.to_string(),
                    public_key,
                },
            );
            self.threshold = self.threshold.max(minimum_threshold(self.len()));
        }
        (self.public_keys(), self.threshold)
    }

    /// Removes a producer. Returns `false`, with a warning, when `id` is not
    /// a member.
    pub fn delete_member(&mut self, id: &str) -> bool {
        let rank = match self.members.iter().find(|(_, m)| m.id == id) {
            Some((rank, _)) => *rank,
            None => {
                warn!(aggregator = %self.aggregator_id, member = id, "not a member, nothing to delete");
                return false;
            }
        };
        self.members.remove(&rank);
        self.threshold = self.threshold.min(minimum_threshold(self.len())).max(1);
        true
    }

    pub fn aggregator_id(&self) -> &str {
        &self.aggregator_id
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of participants, the aggregator included.
    pub fn len(&self) -> usize {
        self.members.len() + 1
    }

    /// Never empty, the aggregator is always a participant.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.values().any(|m| m.id == id)
    }

    /// Participant ids in DKG order.
    pub fn participants(&self) -> Vec<&str> {
        std::iter::once(self.aggregator_id.as_str())
            .chain(self.members.values().map(|m| m.id.as_str()))
            .collect()
    }

    pub fn public_keys(&self) -> Vec<PublicKey> {
        std::iter::once(self.aggregator_key)
            .chain(self.members.values().map(|m| m.public_key))
            .collect()
    }

    pub fn index_of(&self, id: &str) -> Option<Idx> {
        self.participants()
            .iter()
            .position(|p| *p == id)
            .map(|i| i as Idx)
    }

    /// The DKG configuration matching the current membership.
    pub fn group(&self) -> DKGResult<Group<KeyCurve>> {
        Group::from_keys(self.public_keys(), self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use siwa_bls::group::Element;

    fn key(i: u64) -> PublicKey {
        let mut s = crate::PrivateKey::new();
        s.set_int(i + 1);
        let mut k = PublicKey::one();
        k.mul(&s);
        k
    }

    use siwa_bls::group::Scalar as _;

    #[test]
    fn join_grows_threshold_to_majority() {
        let mut topo = Topology::new("0", key(0));
        assert_eq!((topo.len(), topo.threshold()), (1, 1));

        let expected = [2, 2, 3, 3, 4];
        for (i, t) in expected.iter().enumerate() {
            let id = format!("{}.0", i);
            let (keys, threshold) = topo.add_member(&id, key(i as u64 + 1), i as u64 + 1);
            assert_eq!(keys.len(), i + 2);
            assert_eq!(threshold, *t);
        }
        assert_eq!(topo.participants(), vec!["0", "0.0", "1.0", "2.0", "3.0", "4.0"]);
        assert_eq!(topo.index_of("2.0"), Some(3));
    }

    #[test]
    fn duplicate_add_is_a_noop() {
        let mut topo = Topology::new("0", key(0));
        topo.add_member("0.0", key(1), 1);
        let before = topo.clone();
        let (keys, t) = topo.add_member("0.0", key(1), 1);
        assert_eq!(topo, before);
        assert_eq!(keys.len(), 2);
        assert_eq!(t, 2);
    }

    #[test]
    fn taken_rank_is_refused() {
        let mut topo = Topology::new("0", key(0));
        topo.add_member("0.0", key(1), 1);
        let before = topo.clone();

        let (keys, t) = topo.add_member("9.0", key(9), 1);
        assert_eq!(topo, before);
        assert!(topo.contains("0.0"));
        assert!(!topo.contains("9.0"));
        assert_eq!(topo.participants(), vec!["0", "0.0"]);
        assert_eq!((keys.len(), t), (2, 2));
    }

    #[test]
    fn missing_delete_is_a_noop() {
        let mut topo = Topology::new("0", key(0));
        topo.add_member("0.0", key(1), 1);
        let before = topo.clone();
        assert!(!topo.delete_member("7.0"));
        assert!(!topo.delete_member("0"));
        assert_eq!(topo, before);
    }

    #[test]
    fn leave_shrinks_threshold() {
        let mut topo = Topology::new("0", key(0));
        for i in 0..5u64 {
            topo.add_member(&format!("{}.0", i), key(i + 1), i + 1);
        }
        assert_eq!(topo.threshold(), 4);

        assert!(topo.delete_member("1.0"));
        assert_eq!(topo.threshold(), 3);
        // the producers after it move up one index
        assert_eq!(topo.index_of("2.0"), Some(2));
        assert_eq!(topo.public_keys()[2], key(3));

        for id in &["0.0", "2.0", "3.0", "4.0"] {
            topo.delete_member(id);
        }
        assert_eq!((topo.len(), topo.threshold()), (1, 1));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join(u64),
        Leave(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(0..12u64).prop_map(Op::Join), (0..12u64).prop_map(Op::Leave)]
    }

    proptest! {
        #[test]
        fn threshold_stays_in_bounds(ops in prop::collection::vec(op(), 1..40)) {
            let one = PublicKey::one();
            let mut topo = Topology::new("0", one);
            for op in ops {
                match op {
                    Op::Join(r) => { topo.add_member(&format!("{}.0", r), one, r + 1); }
                    Op::Leave(r) => { topo.delete_member(&format!("{}.0", r)); }
                }
                let n = topo.len();
                let t = topo.threshold();
                prop_assert!(1 <= t);
                prop_assert!(t <= n / 2 + 1);
                prop_assert!(n / 2 + 1 <= n);
                prop_assert_eq!(topo.participants().len(), n);
            }
        }
    }
}
