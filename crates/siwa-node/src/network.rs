//! Broadcast addressing and the board DKG payloads are published to.
//!
//! Each participant listens on a loopback address derived from its rank and
//! filters on a per-rank topic. Sockets are owned by the transport; this
//! module only derives the addresses and provides an in-memory board that
//! drives a full deal/response round locally.
use crate::NodeError;
use siwa_bls::group::Curve;
use siwa_dkg::{Deal, Response, SessionHandle, SessionMessage};
use std::{collections::HashMap, convert::Infallible};
use tracing::{debug, info, warn};

pub fn pub_endpoint(port: u16) -> String {
    format!("tcp://*:{}", port)
}

/// `tcp://127.b.c.d:port` with `rank = b << 16 | c << 8 | d`. Ranks that do
/// not fit in the loopback range have no endpoint.
pub fn sub_endpoint(port: u16, rank: u64) -> Option<String> {
    let b = rank >> 16;
    if b > 255 {
        return None;
    }
    let c = (rank >> 8) & 0xff;
    let d = rank & 0xff;
    Some(format!("tcp://127.{}.{}.{}:{}", b, c, d, port))
}

pub fn topic_filter(rank: u64) -> String {
    format!("to_node_{}: ", rank)
}

/// Where DKG participants publish their payloads. The channel is assumed
/// authenticated.
pub trait BoardPublisher<C: Curve> {
    type Error;

    fn publish_deal(&mut self, deal: Deal<C>) -> Result<(), Self::Error>;

    fn publish_response(&mut self, response: Response) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone)]
pub struct InMemoryBoard<C: Curve> {
    pub deals: Vec<Deal<C>>,
    pub responses: Vec<Response>,
}

impl<C: Curve> Default for InMemoryBoard<C> {
    fn default() -> Self {
        Self {
            deals: vec![],
            responses: vec![],
        }
    }
}

impl<C: Curve> InMemoryBoard<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every session publishes its deals.
    pub fn publish_deals(&mut self, handles: &[SessionHandle<C>]) -> Result<(), NodeError> {
        for handle in handles {
            for deal in handle.create_deals()? {
                self.publish_deal(deal).unwrap_or_else(|never| match never {});
            }
        }
        debug!(deals = self.deals.len(), "deals published");
        Ok(())
    }

    /// Routes each deal to its recipient and publishes the responses.
    /// Misrouted deals are logged and dropped.
    pub fn deliver_deals(&mut self, handles: &[SessionHandle<C>]) -> Result<(), NodeError> {
        let by_index = index_handles(handles)?;
        let deals = std::mem::take(&mut self.deals);
        for deal in deals {
            let recipient = match by_index.get(&deal.share_idx) {
                Some(h) => h,
                None => {
                    warn!(share = deal.share_idx, "no session for deal");
                    continue;
                }
            };
            match recipient.deliver(&SessionMessage::Deal(deal)) {
                Ok(Some(response)) => self
                    .publish_response(response)
                    .unwrap_or_else(|never| match never {}),
                Ok(None) => {}
                Err(err) => warn!(%err, "deal dropped"),
            }
        }
        Ok(())
    }

    /// Every session sees every response.
    pub fn deliver_responses(&mut self, handles: &[SessionHandle<C>]) {
        for handle in handles {
            for response in &self.responses {
                if let Err(err) = handle.deliver(&SessionMessage::Response(response.clone())) {
                    debug!(%err, dealer = response.dealer_idx, verifier = response.verifier_idx, "response refused");
                }
            }
        }
    }
}

impl<C: Curve> BoardPublisher<C> for InMemoryBoard<C> {
    type Error = Infallible;

    fn publish_deal(&mut self, deal: Deal<C>) -> Result<(), Infallible> {
        self.deals.push(deal);
        Ok(())
    }

    fn publish_response(&mut self, response: Response) -> Result<(), Infallible> {
        self.responses.push(response);
        Ok(())
    }
}

fn index_handles<C: Curve>(
    handles: &[SessionHandle<C>],
) -> Result<HashMap<u32, &SessionHandle<C>>, NodeError> {
    handles
        .iter()
        .map(|h| -> Result<_, NodeError> { Ok((h.index()?, h)) })
        .collect()
}

/// Runs one full deal/response round over the handles and returns how many
/// sessions ended up certified.
pub fn run_exchange<C: Curve>(handles: &[SessionHandle<C>]) -> Result<usize, NodeError> {
    let mut board = InMemoryBoard::new();
    board.publish_deals(handles)?;
    board.deliver_deals(handles)?;
    board.deliver_responses(handles);

    let certified = handles.iter().filter(|h| h.is_certified()).count();
    info!(sessions = handles.len(), certified, "exchange done");
    Ok(certified)
}
