use crate::{
    group::Group,
    session::{SessionHandle, SessionMessage},
    types::Response,
};
use rand::prelude::*;
use siwa_bls::group::Curve;

pub fn setup_group<C: Curve>(n: usize, t: usize) -> (Vec<C::Scalar>, Group<C>) {
    let (privs, pubs): (Vec<_>, Vec<_>) = (0..n).map(|_| C::keypair(&mut thread_rng())).unzip();
    (privs, Group::from_keys(pubs, t).unwrap())
}

pub fn sessions<C: Curve>(n: usize, t: usize) -> Vec<SessionHandle<C>> {
    let (privs, group) = setup_group::<C>(n, t);
    privs
        .into_iter()
        .map(|p| SessionHandle::new(p, group.clone()).unwrap())
        .collect()
}

/// Runs deals then responses through every handle, returns all responses.
pub fn full_exchange<C: Curve>(handles: &[SessionHandle<C>]) -> Vec<Response> {
    let deals = handles
        .iter()
        .flat_map(|h| h.create_deals().unwrap())
        .collect::<Vec<_>>();

    let responses = deals
        .into_iter()
        .map(|d| {
            let to = d.share_idx as usize;
            handles[to].deliver(&SessionMessage::Deal(d)).unwrap().unwrap()
        })
        .collect::<Vec<_>>();

    for h in handles {
        for r in &responses {
            h.deliver(&SessionMessage::Response(r.clone())).unwrap();
        }
    }
    responses
}
