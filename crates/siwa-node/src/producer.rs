//! Per-participant handle of a producer.
use crate::{
    network, querier::Querier, signature, NodeError, Partial, PrivateKey, PublicKey, SessionHandle,
};
use siwa_bls::poly::Idx;
use std::fmt;
use tracing::{debug, warn};

/// A data producer attached to one aggregator. It answers queries from its
/// backend and signs every answer with its DKG share.
pub struct Producer {
    id: String,
    aggregator_id: String,
    rank: u64,
    private_key: PrivateKey,
    public_key: PublicKey,
    broadcast_port: u16,
    querier: Box<dyn Querier>,
    index: Option<Idx>,
    session: Option<SessionHandle>,
}

// the private key stays out of logs
impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("id", &self.id)
            .field("aggregator_id", &self.aggregator_id)
            .field("rank", &self.rank)
            .field("index", &self.index)
            .field("querier", &self.querier)
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

impl Producer {
    pub(crate) fn new(
        id: String,
        aggregator_id: String,
        rank: u64,
        private_key: PrivateKey,
        public_key: PublicKey,
        broadcast_port: u16,
        querier: Box<dyn Querier>,
    ) -> Self {
        Self {
            id,
            aggregator_id,
            rank,
            private_key,
            public_key,
            broadcast_port,
            querier,
            index: None,
            session: None,
        }
    }

    /// Installs the session of a new configuration. The previous session is
    /// dropped, never reused.
    pub(crate) fn rekey(&mut self, index: Option<Idx>, session: Option<SessionHandle>) {
        self.index = index;
        self.session = session;
    }

    pub(crate) fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn aggregator_id(&self) -> &str {
        &self.aggregator_id
    }

    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// Position in the current DKG configuration, if any.
    pub fn index(&self) -> Option<Idx> {
        self.index
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn ready_to_query(&self) -> bool {
        self.session.as_ref().map_or(false, SessionHandle::is_certified)
    }

    /// Evaluates `expression` on the backend and signs the result. The share
    /// is `None` when the session cannot sign yet.
    pub fn query(&self, expression: &str) -> Result<(String, Option<Partial>), NodeError> {
        let result = self.querier.query(expression)?;
        let share = match &self.session {
            Some(session) => match signature::sign(session, result.as_bytes()) {
                Ok(share) => Some(share),
                Err(err) => {
                    warn!(producer = %self.id, %err, "could not sign query result");
                    None
                }
            },
            None => {
                warn!(producer = %self.id, "no session, query result is unsigned");
                None
            }
        };
        debug!(producer = %self.id, expression, signed = share.is_some(), "query answered");
        Ok((result, share))
    }

    pub fn verify(&self, message: &[u8], share: &[u8]) -> bool {
        self.session
            .as_ref()
            .map_or(false, |s| signature::verify(s, message, share))
    }

    /// Recovers the group signature with the threshold and size of the
    /// current configuration.
    pub fn recover(&self, message: &[u8], shares: &[Partial]) -> Option<Vec<u8>> {
        let session = self.session.as_ref()?;
        let (threshold, n) = match session.with(|s| (s.group().threshold, s.group().len())) {
            Ok(params) => params,
            Err(err) => {
                warn!(producer = %self.id, %err, "session unavailable");
                return None;
            }
        };
        match signature::recover(session, threshold, n, message, shares) {
            Ok(sig) => Some(sig),
            Err(err) => {
                warn!(producer = %self.id, %err, "recovery failed");
                None
            }
        }
    }

    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> bool {
        self.session
            .as_ref()
            .map_or(false, |s| signature::verify_signature(s, message, signature))
    }

    pub fn distributed_public_key(&self) -> Option<PublicKey> {
        self.session
            .as_ref()
            .and_then(|s| signature::distributed_public_key(s).ok())
    }

    /// Where this producer listens for its aggregator's broadcasts.
    pub fn sub_endpoint(&self) -> Option<String> {
        network::sub_endpoint(self.broadcast_port, self.rank)
    }

    pub fn topic_filter(&self) -> String {
        network::topic_filter(self.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{querier::MemoryQuerier, KeyCurve};
    use siwa_bls::group::Curve;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Producer: Send, Sync);

    fn producer() -> Producer {
        let (private, public) = KeyCurve::keypair(&mut rand::thread_rng());
        let mut backend = MemoryQuerier::default();
        backend.insert("k1", "v1");
        Producer::new(
            "0.0".to_string(),
            "0".to_string(),
            1,
            private,
            public,
            5555,
            Box::new(backend),
        )
    }

    #[test]
    fn without_session() {
        let p = producer();
        assert!(!p.ready_to_query());
        assert_eq!(p.query("k1").unwrap(), ("v1".to_string(), None));
        assert_eq!(p.query("k2").unwrap().0, "");
        assert!(!p.verify(b"v1", &[]));
        assert!(p.recover(b"v1", &[]).is_none());
        assert!(p.distributed_public_key().is_none());
    }

    #[test]
    fn addressing_follows_rank() {
        let p = producer();
        assert_eq!(p.sub_endpoint().unwrap(), "tcp://127.0.0.1:5555");
        assert_eq!(p.topic_filter(), "to_node_1: ");
    }

    #[test]
    fn debug_hides_key() {
        let p = producer();
        let out = format!("{:?}", p);
        assert!(out.contains("0.0"));
        assert!(!out.contains("private"));
    }

    #[test]
    fn empty_expression_is_an_error() {
        match producer().query("  ").unwrap_err() {
            NodeError::Query(_) => {}
            e => panic!("unexpected error {}", e),
        }
    }
}
