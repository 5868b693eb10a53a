//! Pedersen DKG session held by a single member.
//!
//! A session is tied to one [`Group`]: it issues one deal per other member,
//! verifies the deal it receives from every other dealer and collects the
//! responses of every verifier. It becomes `Certified` once every dealer,
//! itself included, gathered `threshold` approvals. Any complaint fails the
//! session for good; a membership change requires a brand new session.
use crate::{
    errors::{DKGError, DKGResult, ShareError},
    group::{Group, SessionId},
    status::{Status, StatusMatrix},
    types::{Deal, DistKeyShare, Response},
};
use rand_core::RngCore;
use siwa_bls::{
    ecies,
    group::{Curve, Element},
    poly::{Idx, PrivatePoly, PublicPoly},
    sig::Share,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    DealsGenerated,
    Certifying,
    Certified,
    Failed,
}

/// The outcome of verifying a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

#[derive(Debug)]
pub struct DkgSession<C: Curve> {
    private_key: C::Scalar,
    group: Group<C>,
    session_id: SessionId,
    index: Idx,
    secret: PrivatePoly<C>,
    public: PublicPoly<C>,
    state: SessionState,
    /// Verified shares and commitments, per dealer.
    received: BTreeMap<Idx, (C::Scalar, PublicPoly<C>)>,
    statuses: StatusMatrix,
}

impl<C: Curve> DkgSession<C> {
    pub fn new(private_key: C::Scalar, group: Group<C>) -> DKGResult<Self> {
        Self::new_from(private_key, group, &mut rand::thread_rng())
    }

    /// Samples the session's secret polynomial from `rng`.
    pub fn new_from<R: RngCore>(
        private_key: C::Scalar,
        group: Group<C>,
        rng: &mut R,
    ) -> DKGResult<Self> {
        group.check()?;
        let public_key = C::public_of(&private_key);
        let index = group
            .index(&public_key)
            .ok_or(DKGError::PublicKeyNotFound)?;

        if group.threshold < 2 || group.threshold > group.len() {
            return Err(DKGError::InvalidThreshold(group.threshold, 2, group.len()));
        }

        let secret = PrivatePoly::<C>::new_from(group.threshold - 1, rng);
        let public = secret.commit::<C::Point>();
        let session_id = group.session_id()?;
        let statuses = StatusMatrix::new(group.len());

        Ok(Self {
            private_key,
            session_id,
            index,
            secret,
            public,
            state: SessionState::Initialized,
            received: BTreeMap::new(),
            statuses,
            group,
        })
    }

    pub fn index(&self) -> Idx {
        self.index
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn group(&self) -> &Group<C> {
        &self.group
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn is_certified(&self) -> bool {
        self.state == SessionState::Certified
    }

    pub fn statuses(&self) -> &StatusMatrix {
        &self.statuses
    }

    /// Encrypts one share to every other member. Only valid once, right after
    /// creation; on error the session must be discarded.
    pub fn create_deals(&mut self) -> DKGResult<Vec<Deal<C>>> {
        self.create_deals_from(&mut rand::thread_rng())
    }

    pub fn create_deals_from<R: RngCore>(&mut self, rng: &mut R) -> DKGResult<Vec<Deal<C>>> {
        if self.state != SessionState::Initialized {
            return Err(DKGError::InvalidState(self.state));
        }

        let deals = self
            .group
            .nodes
            .iter()
            .filter(|n| n.id() != self.index)
            .map(|n| {
                let share = self.secret.eval(n.id());
                let buf = bincode::serialize(&share.value)?;
                Ok(Deal {
                    session_id: self.session_id,
                    dealer_idx: self.index,
                    share_idx: n.id(),
                    secret: ecies::encrypt::<C, _>(n.key(), &buf, rng)?,
                    public: self.public.clone(),
                })
            })
            .collect::<DKGResult<Vec<_>>>()?;

        self.state = SessionState::DealsGenerated;
        debug!(index = self.index, deals = deals.len(), "created deals");
        self.check_certified();
        Ok(deals)
    }

    /// Verifies the deal addressed to this session. Malformed deliveries are
    /// errors and leave the session untouched; a deal that fails verification
    /// yields a complaint and fails the session.
    pub fn process_deal(&mut self, deal: &Deal<C>) -> DKGResult<(Response, Verdict)> {
        self.ensure_active()?;

        if deal.session_id != self.session_id {
            return Err(DKGError::SessionMismatch);
        }
        if deal.share_idx != self.index {
            return Err(DKGError::WrongRecipient(deal.share_idx, self.index));
        }
        if deal.dealer_idx == self.index || !self.group.contains_index(deal.dealer_idx) {
            return Err(DKGError::InvalidDealer(deal.dealer_idx));
        }
        if self.received.contains_key(&deal.dealer_idx) {
            return Err(DKGError::DuplicateDeal(deal.dealer_idx));
        }

        let (status, verdict) = match self.check_deal(deal) {
            Ok(share) => {
                self.received
                    .insert(deal.dealer_idx, (share, deal.public.clone()));
                (Status::Success, Verdict::Approve)
            }
            Err(err) => {
                warn!(index = self.index, dealer = deal.dealer_idx, %err, "rejecting deal");
                self.state = SessionState::Failed;
                (Status::Complaint, Verdict::Reject)
            }
        };

        self.statuses.set(deal.dealer_idx, self.index, status);
        self.advance();

        let response = Response {
            session_id: self.session_id,
            dealer_idx: deal.dealer_idx,
            verifier_idx: self.index,
            status,
        };
        Ok((response, verdict))
    }

    fn check_deal(&self, deal: &Deal<C>) -> Result<C::Scalar, ShareError> {
        let dealer = deal.dealer_idx;
        let expected = self.group.threshold - 1;
        if deal.public.degree() != expected {
            return Err(ShareError::InvalidPublicPolynomial(
                dealer,
                deal.public.degree(),
                expected,
            ));
        }

        let buf = ecies::decrypt::<C>(&self.private_key, &deal.secret)
            .map_err(|err| ShareError::InvalidCiphertext(dealer, err))?;
        let share: C::Scalar =
            bincode::deserialize(&buf).map_err(|err| ShareError::Malformed(dealer, err))?;

        if !share_correct::<C>(self.index, &share, &deal.public) {
            return Err(ShareError::InvalidShare(dealer));
        }
        Ok(share)
    }

    /// Records a verifier's response. Complaints fail the session. Once the
    /// session is certified responses are acknowledged and ignored.
    pub fn process_response(&mut self, response: &Response) -> DKGResult<()> {
        if self.state == SessionState::Failed {
            return Err(DKGError::InvalidState(self.state));
        }
        if response.session_id != self.session_id {
            return Err(DKGError::SessionMismatch);
        }

        if !self.group.contains_index(response.dealer_idx) {
            return Err(DKGError::InvalidDealer(response.dealer_idx));
        }
        // our own responses were produced by `process_deal`, nothing to check
        if response.verifier_idx != self.index
            && (response.dealer_idx == response.verifier_idx
                || !self.group.contains_index(response.verifier_idx))
        {
            return Err(DKGError::InvalidVerifier(response.verifier_idx));
        }

        if self.state == SessionState::Certified {
            debug!(index = self.index, dealer = response.dealer_idx, verifier = response.verifier_idx, "already certified");
            return Ok(());
        }

        if !response.status.is_success() {
            warn!(
                index = self.index,
                dealer = response.dealer_idx,
                verifier = response.verifier_idx,
                "complaint received, session failed"
            );
            self.state = SessionState::Failed;
            return Err(DKGError::Complaint(
                response.dealer_idx,
                response.verifier_idx,
            ));
        }

        self.statuses
            .set(response.dealer_idx, response.verifier_idx, Status::Success);
        self.advance();
        Ok(())
    }

    /// This member's share of the distributed key.
    pub fn key_share(&self) -> DKGResult<DistKeyShare<C>> {
        if !self.is_certified() {
            return Err(DKGError::NotCertified);
        }

        let mut share = self.secret.eval(self.index).value;
        let mut public = self.public.clone();
        for (s, p) in self.received.values() {
            share.add(s);
            public.add(p);
        }

        Ok(DistKeyShare {
            share: Share {
                index: self.index,
                private: share,
            },
            public,
        })
    }

    fn ensure_active(&self) -> DKGResult<()> {
        match self.state {
            SessionState::Failed | SessionState::Certified => Err(DKGError::InvalidState(self.state)),
            _ => Ok(()),
        }
    }

    fn advance(&mut self) {
        if self.state == SessionState::DealsGenerated {
            self.state = SessionState::Certifying;
        }
        self.check_certified();
    }

    fn check_certified(&mut self) {
        let issued = matches!(
            self.state,
            SessionState::DealsGenerated | SessionState::Certifying
        );
        if issued
            && self.received.len() + 1 == self.group.len()
            && self.statuses.all_approved(self.group.threshold)
        {
            self.state = SessionState::Certified;
            info!(index = self.index, n = self.group.len(), threshold = self.group.threshold, "session certified");
        }
    }
}

/// Checks the share against the evaluation of the dealer's commitment.
fn share_correct<C: Curve>(idx: Idx, share: &C::Scalar, public: &PublicPoly<C>) -> bool {
    C::public_of(share) == public.eval(idx).value
}

/// Traffic a session consumes.
#[derive(Clone, Debug)]
pub enum SessionMessage<C: Curve> {
    Deal(Deal<C>),
    Response(Response),
}

/// Shared handle on a session. Every message goes through the session's own
/// lock so deliveries to one session are serialized while distinct sessions
/// never contend.
#[derive(Debug)]
pub struct SessionHandle<C: Curve>(Arc<Mutex<DkgSession<C>>>);

impl<C: Curve> Clone for SessionHandle<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C: Curve> From<DkgSession<C>> for SessionHandle<C> {
    fn from(session: DkgSession<C>) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }
}

impl<C: Curve> SessionHandle<C> {
    pub fn new(private_key: C::Scalar, group: Group<C>) -> DKGResult<Self> {
        DkgSession::new(private_key, group).map(Self::from)
    }

    fn lock(&self) -> DKGResult<MutexGuard<'_, DkgSession<C>>> {
        self.0.lock().map_err(|_| DKGError::Poisoned)
    }

    /// Runs `f` with exclusive access to the session.
    pub fn with<T>(&self, f: impl FnOnce(&mut DkgSession<C>) -> T) -> DKGResult<T> {
        let mut session = self.lock()?;
        Ok(f(&mut session))
    }

    pub fn create_deals(&self) -> DKGResult<Vec<Deal<C>>> {
        self.lock()?.create_deals()
    }

    /// Feeds one message to the session. A deal yields the response to
    /// broadcast.
    pub fn deliver(&self, msg: &SessionMessage<C>) -> DKGResult<Option<Response>> {
        let mut session = self.lock()?;
        match msg {
            SessionMessage::Deal(deal) => session.process_deal(deal).map(|(r, _)| Some(r)),
            SessionMessage::Response(resp) => session.process_response(resp).map(|_| None),
        }
    }

    pub fn state(&self) -> DKGResult<SessionState> {
        Ok(self.lock()?.state())
    }

    pub fn index(&self) -> DKGResult<Idx> {
        Ok(self.lock()?.index())
    }

    pub fn session_id(&self) -> DKGResult<SessionId> {
        Ok(self.lock()?.session_id())
    }

    /// `false` when the lock is poisoned.
    pub fn is_certified(&self) -> bool {
        self.lock().map(|s| s.is_certified()).unwrap_or(false)
    }

    pub fn key_share(&self) -> DKGResult<DistKeyShare<C>> {
        self.lock()?.key_share()
    }

    /// `true` when both handles point to the same session.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
