use crate::{opts::*, CLIError};
use anyhow::Result;
use rand::RngCore;
use serde::Serialize;
use siwa_bls::group::Curve;
use siwa_node::{
    codec, config::NetworkConfig, network::run_exchange, KeyCurve, Orchestrator,
};
use std::{fs::File, io::Write};
use tracing::{error, info, warn};

#[derive(Serialize, Debug)]
struct KeypairJson {
    #[serde(rename = "privateKey")]
    private_key: String,
    #[serde(rename = "publicKey")]
    public_key: String,
}

pub fn keygen<R>(opts: KeygenOpts, rng: &mut R) -> Result<()>
where
    R: RngCore,
{
    let (private, public) = KeyCurve::keypair(rng);
    let output = KeypairJson {
        private_key: codec::encode_private_key(&private)?,
        public_key: codec::encode_public_key(&public)?,
    };

    if let Some(path) = opts.path {
        let f = File::create(path)?;
        serde_json::to_writer(&f, &output)?;
    } else {
        serde_json::to_writer(std::io::stdout(), &output)?;
    }

    Ok(())
}

/// What a simulation produced. Hex fields are bincode encodings.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub value: String,
    pub members: usize,
    pub threshold: usize,
    pub valid_shares: usize,
    pub signature: String,
    pub public_key: String,
}

pub fn simulate(opts: SimulateOpts) -> Result<SimulationReport> {
    let config: NetworkConfig = serde_json::from_reader(File::open(&opts.config)?)?;

    let mut orchestrator = Orchestrator::new();
    let aggregator_id = orchestrator.create_aggregator(&config.aggregator)?;
    for producer in &config.producers {
        // a bad record only costs that producer its place
        match orchestrator.join(producer) {
            Ok(id) => info!(producer = %id, "joined"),
            Err(err) => error!(%err, "producer could not join"),
        }
    }

    let handles = orchestrator.session_handles(&aggregator_id)?;
    let certified = run_exchange(&handles)?;
    if certified != handles.len() {
        return Err(CLIError::NotCertified {
            certified,
            members: handles.len(),
        }
        .into());
    }

    let producers = orchestrator.producers_of(&aggregator_id);
    let mut answers = Vec::with_capacity(producers.len());
    for producer in &producers {
        match producer.query(&opts.key) {
            Ok((value, Some(share))) => answers.push((value, share)),
            Ok((_, None)) => warn!(producer = producer.id(), "unsigned answer"),
            Err(err) => warn!(producer = producer.id(), %err, "query failed"),
        }
    }
    let value = answers.first().map(|(v, _)| v.clone()).ok_or(CLIError::NoAnswer)?;

    // the first producer acts as the verifier of everyone else's share
    let verifier = *producers.first().ok_or(CLIError::NoAnswer)?;
    let mut shares = answers
        .into_iter()
        .filter(|(v, share)| *v == value && verifier.verify(v.as_bytes(), share))
        .map(|(_, share)| share)
        .collect::<Vec<_>>();
    if let Some(aggregator) = orchestrator.aggregator(&aggregator_id) {
        shares.extend(aggregator.sign(value.as_bytes()));
    }

    let signature = verifier
        .recover(value.as_bytes(), &shares)
        .ok_or_else(|| CLIError::Recovery(shares.len()))?;
    let public_key = verifier
        .distributed_public_key()
        .ok_or(CLIError::NoAnswer)?;

    let report = SimulationReport {
        value,
        members: handles.len(),
        threshold: orchestrator
            .topology(&aggregator_id)
            .map(|t| t.threshold())
            .unwrap_or_default(),
        valid_shares: shares.len(),
        signature: hex::encode(&signature),
        public_key: codec::encode_public_key(&public_key)?,
    };
    info!(
        value = %report.value,
        shares = report.valid_shares,
        threshold = report.threshold,
        "signature recovered"
    );

    if let Some(path) = opts.output_path {
        let f = File::create(path)?;
        serde_json::to_writer(&f, &report)?;
    } else {
        let mut out = std::io::stdout();
        serde_json::to_writer(&mut out, &report)?;
        writeln!(out)?;
    }

    Ok(report)
}
