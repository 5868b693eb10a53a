//! # siwa-cli
//!
//! Key generation and a local simulation of one aggregator group.
pub mod actions;
pub mod opts;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub type CLIResult<T> = std::result::Result<T, CLIError>;

#[derive(Debug, Error)]
pub enum CLIError {
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),
    #[error("{0}")]
    NodeError(#[from] siwa_node::NodeError),
    #[error("only {certified}/{members} sessions certified")]
    NotCertified { certified: usize, members: usize },
    #[error("no producer answered the query")]
    NoAnswer,
    #[error("could not recover a signature from {0} shares")]
    Recovery(usize),
}

/// Logs go to stderr, filtered by `RUST_LOG` (`info` when unset).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
