//! Membership changes and the rekeying they trigger.
//!
//! Every join or leave is staged: the topology change is applied to a copy,
//! fresh sessions are built for every member of the new configuration and
//! only then are topology, sessions and registry committed together. A
//! single failed build leaves the previous configuration untouched.
use crate::{
    codec,
    config::{AggregatorConfig, ProducerConfig},
    network,
    registry::{Record, Registry, Role},
    signature,
    topology::Topology,
    KeyCurve, NodeError, Partial, PrivateKey, Producer, PublicKey, SessionHandle,
};
use siwa_bls::{group::Curve, poly::Idx};
use siwa_dkg::Group;
use std::{collections::BTreeMap, fmt};
use tracing::{info, warn};

/// The coordinating participant of a group. It always holds DKG index 0.
pub struct Aggregator {
    id: String,
    private_key: PrivateKey,
    public_key: PublicKey,
    broadcast_port: u16,
    topology: Topology,
    session: Option<SessionHandle>,
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("id", &self.id)
            .field("broadcast_port", &self.broadcast_port)
            .field("topology", &self.topology)
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

impl Aggregator {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn broadcast_port(&self) -> u16 {
        self.broadcast_port
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn ready(&self) -> bool {
        self.session.as_ref().map_or(false, SessionHandle::is_certified)
    }

    /// Signs a result the producers reported.
    pub fn sign(&self, message: &[u8]) -> Option<Partial> {
        let session = self.session.as_ref()?;
        match signature::sign(session, message) {
            Ok(share) => Some(share),
            Err(err) => {
                warn!(aggregator = %self.id, %err, "could not sign");
                None
            }
        }
    }

    pub fn verify(&self, message: &[u8], share: &[u8]) -> bool {
        self.session
            .as_ref()
            .map_or(false, |s| signature::verify(s, message, share))
    }

    pub fn pub_endpoint(&self) -> String {
        network::pub_endpoint(self.broadcast_port)
    }
}

/// Owns every aggregator and producer of the process together with the
/// lookup tables. All mutation goes through `&mut self`.
#[derive(Debug, Default)]
pub struct Orchestrator {
    registry: Registry,
    aggregators: BTreeMap<String, Aggregator>,
    producers: BTreeMap<String, Producer>,
}

/// Sessions of a staged configuration, in DKG order. `None` entries when the
/// group is too small to run a DKG.
type Staged = Vec<Option<SessionHandle>>;

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator alone in its group and returns its id.
    pub fn create_aggregator(&mut self, config: &AggregatorConfig) -> Result<String, NodeError> {
        let private_key = config.private_key()?;
        let public_key = KeyCurve::public_of(&private_key);
        let encoded = self.unused_public_key(&public_key)?;

        let id = self.registry.next_aggregator_id();
        self.registry.insert(
            &id,
            Record {
                role: Role::Aggregator,
                parent: id.clone(),
                rank: 0,
                public_key: encoded,
            },
        );
        self.registry.reindex(&id, vec![(id.as_str(), 0)]);

        let aggregator = Aggregator {
            id: id.clone(),
            private_key,
            public_key,
            broadcast_port: config.broadcast_port,
            topology: Topology::new(&id, public_key),
            session: None,
        };
        self.aggregators.insert(id.clone(), aggregator);
        info!(aggregator = %id, port = config.broadcast_port, "aggregator created");
        Ok(id)
    }

    /// Adds a producer to its aggregator's group and rekeys every member.
    /// Returns the producer's id.
    pub fn join(&mut self, config: &ProducerConfig) -> Result<String, NodeError> {
        self.join_with(config, build_session)
    }

    fn join_with<F>(&mut self, config: &ProducerConfig, mut build: F) -> Result<String, NodeError>
    where
        F: FnMut(&str, &PrivateKey, &Group<KeyCurve>) -> Result<SessionHandle, NodeError>,
    {
        let aggregator_id = config.aggregator_id()?.to_string();
        let aggregator = self
            .aggregators
            .get(&aggregator_id)
            .ok_or_else(|| NodeError::UnknownAggregator(aggregator_id.clone()))?;
        let broadcast_port = aggregator.broadcast_port;
        let mut topology = aggregator.topology.clone();
        let private_key = config.private_key()?;
        let public_key = KeyCurve::public_of(&private_key);
        let encoded = self.unused_public_key(&public_key)?;
        let querier = config.querier.build()?;

        let (id, counter) = self.registry.next_producer_id(&aggregator_id);
        let rank = counter + 1;

        let (_, threshold) = topology.add_member(&id, public_key, rank);
        let staged = self
            .stage(&topology, Some((id.as_str(), &private_key)), &mut build)
            .map_err(|err| {
                warn!(aggregator = %aggregator_id, producer = %id, %err, "join rolled back");
                err
            })?;

        let producer = Producer::new(
            id.clone(),
            aggregator_id.clone(),
            rank,
            private_key,
            public_key,
            broadcast_port,
            querier,
        );
        self.producers.insert(id.clone(), producer);
        self.registry.insert(
            &id,
            Record {
                role: Role::Producer,
                parent: aggregator_id.clone(),
                rank,
                public_key: encoded,
            },
        );
        let members = topology.len();
        self.commit(&aggregator_id, topology, staged);
        info!(aggregator = %aggregator_id, producer = %id, members, threshold, "producer joined");
        Ok(id)
    }

    /// Removes a producer from its group and rekeys the remaining members.
    pub fn leave(&mut self, id: &str) -> Result<(), NodeError> {
        self.leave_with(id, build_session)
    }

    fn leave_with<F>(&mut self, id: &str, mut build: F) -> Result<(), NodeError>
    where
        F: FnMut(&str, &PrivateKey, &Group<KeyCurve>) -> Result<SessionHandle, NodeError>,
    {
        let aggregator_id = self
            .producers
            .get(id)
            .map(|p| p.aggregator_id().to_string())
            .ok_or_else(|| NodeError::UnknownMember(id.to_string()))?;
        let aggregator = self
            .aggregators
            .get(&aggregator_id)
            .ok_or_else(|| NodeError::UnknownAggregator(aggregator_id.clone()))?;

        let mut topology = aggregator.topology.clone();
        topology.delete_member(id);
        let staged = self.stage(&topology, None, &mut build).map_err(|err| {
            warn!(aggregator = %aggregator_id, producer = id, %err, "leave rolled back");
            err
        })?;

        self.producers.remove(id);
        self.registry.remove(id);
        let (members, threshold) = (topology.len(), topology.threshold());
        self.commit(&aggregator_id, topology, staged);
        info!(aggregator = %aggregator_id, producer = id, members, threshold, "producer left");
        Ok(())
    }

    /// Builds one session per participant of `topology`. Nothing is mutated.
    fn stage<F>(
        &self,
        topology: &Topology,
        joiner: Option<(&str, &PrivateKey)>,
        build: &mut F,
    ) -> Result<Staged, NodeError>
    where
        F: FnMut(&str, &PrivateKey, &Group<KeyCurve>) -> Result<SessionHandle, NodeError>,
    {
        let participants = topology.participants();
        if topology.threshold() < 2 {
            warn!(
                aggregator = topology.aggregator_id(),
                threshold = topology.threshold(),
                "group too small for a dkg, members stay without session"
            );
            return Ok(vec![None; participants.len()]);
        }

        let group = topology.group()?;
        participants
            .into_iter()
            .map(|id| {
                let key = match joiner {
                    Some((joiner_id, key)) if joiner_id == id => key,
                    _ => self.private_key_of(id)?,
                };
                build(id, key, &group).map(Some)
            })
            .collect()
    }

    /// Installs a staged configuration.
    fn commit(&mut self, aggregator_id: &str, topology: Topology, staged: Staged) {
        let participants = topology
            .participants()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        for (idx, (id, session)) in participants.iter().zip(staged).enumerate() {
            if id == aggregator_id {
                if let Some(aggregator) = self.aggregators.get_mut(aggregator_id) {
                    aggregator.session = session;
                }
            } else if let Some(producer) = self.producers.get_mut(id) {
                producer.rekey(Some(idx as Idx), session);
            }
        }
        self.registry.reindex(
            aggregator_id,
            participants
                .iter()
                .enumerate()
                .map(|(i, id)| (id.as_str(), i as Idx)),
        );
        if let Some(aggregator) = self.aggregators.get_mut(aggregator_id) {
            aggregator.topology = topology;
        }
    }

    fn private_key_of(&self, id: &str) -> Result<&PrivateKey, NodeError> {
        if let Some(aggregator) = self.aggregators.get(id) {
            return Ok(&aggregator.private_key);
        }
        self.producers
            .get(id)
            .map(Producer::private_key)
            .ok_or_else(|| NodeError::UnknownMember(id.to_string()))
    }

    fn unused_public_key(&self, public_key: &PublicKey) -> Result<String, NodeError> {
        let encoded = codec::encode_public_key(public_key)?;
        match self.registry.by_public_key(&encoded) {
            Some(owner) => Err(NodeError::DuplicatePublicKey(owner.to_string())),
            None => Ok(encoded),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn aggregator(&self, id: &str) -> Option<&Aggregator> {
        self.aggregators.get(id)
    }

    pub fn producer(&self, id: &str) -> Option<&Producer> {
        self.producers.get(id)
    }

    pub fn topology(&self, aggregator_id: &str) -> Option<&Topology> {
        self.aggregators.get(aggregator_id).map(Aggregator::topology)
    }

    /// Producers of an aggregator in DKG order.
    pub fn producers_of(&self, aggregator_id: &str) -> Vec<&Producer> {
        self.topology(aggregator_id)
            .map(|t| {
                t.participants()
                    .into_iter()
                    .skip(1)
                    .filter_map(|id| self.producers.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Session handles of every member of the group, in DKG order.
    pub fn session_handles(&self, aggregator_id: &str) -> Result<Vec<SessionHandle>, NodeError> {
        let aggregator = self
            .aggregators
            .get(aggregator_id)
            .ok_or_else(|| NodeError::UnknownAggregator(aggregator_id.to_string()))?;
        aggregator
            .topology
            .participants()
            .into_iter()
            .map(|id| {
                let session = if id == aggregator_id {
                    aggregator.session.as_ref()
                } else {
                    self.producers.get(id).and_then(Producer::session)
                };
                session
                    .cloned()
                    .ok_or_else(|| NodeError::NoSession(id.to_string()))
            })
            .collect()
    }
}

fn build_session(
    _id: &str,
    private_key: &PrivateKey,
    group: &Group<KeyCurve>,
) -> Result<SessionHandle, NodeError> {
    Ok(SessionHandle::new(private_key.clone(), group.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::QuerierConfig, network::run_exchange};
    use rand::thread_rng;
    use siwa_dkg::DKGError;

    fn hex_key() -> String {
        let (private, _) = KeyCurve::keypair(&mut thread_rng());
        codec::encode_private_key(&private).unwrap()
    }

    fn aggregator_config() -> AggregatorConfig {
        AggregatorConfig {
            private_key: hex_key(),
            broadcast_port: 5555,
        }
    }

    fn producer_config(aggregator_id: &str) -> ProducerConfig {
        ProducerConfig {
            aggregator_id: aggregator_id.to_string(),
            private_key: hex_key(),
            querier: QuerierConfig::Memory {
                entries: vec![("k1".to_string(), "v1".to_string())]
                    .into_iter()
                    .collect(),
            },
        }
    }

    fn network(producers: usize) -> (Orchestrator, String) {
        let mut orch = Orchestrator::new();
        let agg = orch.create_aggregator(&aggregator_config()).unwrap();
        for _ in 0..producers {
            orch.join(&producer_config(&agg)).unwrap();
        }
        (orch, agg)
    }

    #[test]
    fn lone_aggregator_has_no_session() {
        let (orch, agg) = network(0);
        assert_eq!(agg, "0");
        let aggregator = orch.aggregator(&agg).unwrap();
        assert!(aggregator.session().is_none());
        assert_eq!(aggregator.topology().threshold(), 1);
        assert_eq!(aggregator.pub_endpoint(), "tcp://*:5555");
        match orch.session_handles(&agg).unwrap_err() {
            NodeError::NoSession(id) => assert_eq!(id, "0"),
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn members_agree_on_configuration() {
        let (orch, agg) = network(3);
        let handles = orch.session_handles(&agg).unwrap();
        assert_eq!(handles.len(), 4);

        let groups = handles
            .iter()
            .map(|h| h.with(|s| s.group().clone()).unwrap())
            .collect::<Vec<_>>();
        assert!(groups.iter().all(|g| *g == groups[0]));
        assert_eq!(groups[0].threshold, 3);

        let mut indices = handles
            .iter()
            .map(|h| h.index().unwrap())
            .collect::<Vec<_>>();
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2, 3]);

        for (i, p) in orch.producers_of(&agg).iter().enumerate() {
            assert_eq!(p.index(), Some(i as Idx + 1));
            assert_eq!(p.rank(), i as u64 + 1);
            assert_eq!(orch.registry().by_index(&agg, i as Idx + 1), Some(p.id()));
        }
    }

    #[test]
    fn join_rebuilds_every_session() {
        let (mut orch, agg) = network(1);
        let before = orch.session_handles(&agg).unwrap();
        orch.join(&producer_config(&agg)).unwrap();
        let after = orch.session_handles(&agg).unwrap();
        assert_eq!(after.len(), 3);
        for (old, new) in before.iter().zip(&after) {
            assert!(!old.ptr_eq(new));
        }
    }

    #[test]
    fn failed_build_rolls_back() {
        let (mut orch, agg) = network(1);
        let before = orch.session_handles(&agg).unwrap();
        let topology = orch.topology(&agg).unwrap().clone();

        let err = orch
            .join_with(&producer_config(&agg), |id, key, group| {
                if id == "0.0" {
                    return Err(DKGError::InvalidState(siwa_dkg::SessionState::Failed).into());
                }
                build_session(id, key, group)
            })
            .unwrap_err();
        match err {
            NodeError::Protocol(_) => {}
            e => panic!("unexpected error {}", e),
        }

        assert_eq!(orch.topology(&agg).unwrap(), &topology);
        assert!(orch.producer("1.0").is_none());
        assert!(!orch.registry().contains("1.0"));
        let after = orch.session_handles(&agg).unwrap();
        for (old, new) in before.iter().zip(&after) {
            assert!(old.ptr_eq(new));
        }

        // the failed join consumed its id
        assert_eq!(orch.join(&producer_config(&agg)).unwrap(), "2.0");
    }

    #[test]
    fn failed_leave_rolls_back() {
        let (mut orch, agg) = network(3);
        let err = orch
            .leave_with("1.0", |_, _, _| Err(DKGError::Poisoned.into()))
            .unwrap_err();
        match err {
            NodeError::Protocol(DKGError::Poisoned) => {}
            e => panic!("unexpected error {}", e),
        }
        assert!(orch.producer("1.0").is_some());
        assert_eq!(orch.topology(&agg).unwrap().len(), 4);
    }

    #[test]
    fn leave_reindexes() {
        let (mut orch, agg) = network(3);
        assert_eq!(orch.topology(&agg).unwrap().threshold(), 3);
        let before = orch.session_handles(&agg).unwrap();

        orch.leave("1.0").unwrap();
        assert!(orch.producer("1.0").is_none());
        assert!(!orch.registry().contains("1.0"));
        assert_eq!(orch.topology(&agg).unwrap().threshold(), 2);

        let moved = orch.producer("2.0").unwrap();
        assert_eq!(moved.index(), Some(2));
        assert_eq!(moved.rank(), 3);
        assert_eq!(orch.registry().by_index(&agg, 2), Some("2.0"));
        assert_eq!(orch.registry().by_index(&agg, 3), None);

        let after = orch.session_handles(&agg).unwrap();
        assert_eq!(after.len(), 3);
        assert!(!before[0].ptr_eq(&after[0]));
        assert_eq!(run_exchange(&after).unwrap(), 3);
    }

    #[test]
    fn last_leave_drops_sessions() {
        let (mut orch, agg) = network(1);
        orch.leave("0.0").unwrap();
        assert!(orch.aggregator(&agg).unwrap().session().is_none());
        assert_eq!(orch.topology(&agg).unwrap().len(), 1);
    }

    #[test]
    fn reference_errors() {
        let (mut orch, agg) = network(1);
        match orch.leave("9.0").unwrap_err() {
            NodeError::UnknownMember(id) => assert_eq!(id, "9.0"),
            e => panic!("unexpected error {}", e),
        }
        match orch.join(&producer_config("7")).unwrap_err() {
            NodeError::UnknownAggregator(id) => assert_eq!(id, "7"),
            e => panic!("unexpected error {}", e),
        }
        let mut bad = producer_config(&agg);
        bad.private_key = "not hex".to_string();
        match orch.join(&bad).unwrap_err() {
            NodeError::Configuration(_) => {}
            e => panic!("unexpected error {}", e),
        }
        assert_eq!(orch.producers_of(&agg).len(), 1);
        assert!(orch.producers_of("7").is_empty());
    }

    #[test]
    fn duplicate_public_key_is_rejected() {
        let (mut orch, agg) = network(0);
        let config = producer_config(&agg);
        let id = orch.join(&config).unwrap();
        match orch.join(&config).unwrap_err() {
            NodeError::DuplicatePublicKey(owner) => assert_eq!(owner, id),
            e => panic!("unexpected error {}", e),
        }
        assert_eq!(orch.topology(&agg).unwrap().len(), 2);
    }

    #[test]
    fn end_to_end() {
        let (orch, agg) = network(5);
        let handles = orch.session_handles(&agg).unwrap();
        assert_eq!(handles.len(), 6);
        assert_eq!(orch.topology(&agg).unwrap().threshold(), 4);

        assert_eq!(run_exchange(&handles).unwrap(), 6);
        let aggregator = orch.aggregator(&agg).unwrap();
        assert!(aggregator.ready());

        let producers = orch.producers_of(&agg);
        let mut shares = vec![aggregator.sign(b"v1").unwrap()];
        for p in &producers {
            assert!(p.ready_to_query());
            let (result, share) = p.query("k1").unwrap();
            assert_eq!(result, "v1");
            shares.push(share.unwrap());
        }

        let verifier = producers[2];
        assert!(shares.iter().all(|s| verifier.verify(b"v1", s)));
        assert!(aggregator.verify(b"v1", &shares[3]));

        let sig = verifier.recover(b"v1", &shares[2..]).unwrap();
        assert!(producers[0].verify_signature(b"v1", &sig));
        assert!(verifier.recover(b"v1", &shares[3..]).is_none());

        let key = producers[0].distributed_public_key().unwrap();
        assert!(producers.iter().all(|p| p.distributed_public_key() == Some(key)));
    }
}
