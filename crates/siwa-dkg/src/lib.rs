//! # siwa-dkg
//!
//! Pedersen distributed key generation, one session per member. Deals carry an
//! ECIES encrypted share and the dealer's commitment; responses approve or
//! complain about a deal. Transport is left to the caller: sessions only
//! consume [`SessionMessage`]s.

mod errors;
pub use errors::{DKGError, DKGResult, ShareError};

/// Ordered participants and threshold of a DKG configuration
pub mod group;
pub use group::{minimum_threshold, Group, Node, SessionId};

/// 2D binary array tracking which verifier approved which dealer
pub mod status;
pub use status::{Status, StatusMatrix};

mod types;
pub use types::{Deal, DistKeyShare, Response};

/// The per-member state machine and its shared handle
pub mod session;
pub use session::{DkgSession, SessionHandle, SessionMessage, SessionState, Verdict};

#[cfg(test)]
mod test_helpers;
