//! Bootstrap records of the participants. Parsing the file is up to the
//! caller; the records only need `serde`.
use crate::{
    codec,
    querier::{JsonFileQuerier, MemoryQuerier, Querier},
    NodeError, PrivateKey,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// hex of the bincode encoded scalar
    pub private_key: String,
    pub broadcast_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProducerConfig {
    pub aggregator_id: String,
    pub private_key: String,
    pub querier: QuerierConfig,
}

/// Selects the query backend of a producer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum QuerierConfig {
    Memory {
        #[serde(default)]
        entries: HashMap<String, String>,
    },
    JsonFile {
        path: PathBuf,
    },
}

impl QuerierConfig {
    pub fn build(&self) -> Result<Box<dyn Querier>, NodeError> {
        Ok(match self {
            QuerierConfig::Memory { entries } => Box::new(MemoryQuerier::new(entries.clone())),
            QuerierConfig::JsonFile { path } => Box::new(JsonFileQuerier::open(path)?),
        })
    }
}

impl AggregatorConfig {
    pub fn private_key(&self) -> Result<PrivateKey, NodeError> {
        codec::decode_private_key(&self.private_key)
    }
}

impl ProducerConfig {
    pub fn private_key(&self) -> Result<PrivateKey, NodeError> {
        codec::decode_private_key(&self.private_key)
    }

    /// The aggregator must be named; there is no scheduler picking one.
    pub fn aggregator_id(&self) -> Result<&str, NodeError> {
        match self.aggregator_id.trim() {
            "" => Err(NodeError::Configuration(
                "aggregator_id must not be empty".to_string(),
            )),
            id => Ok(id),
        }
    }
}

/// One aggregator and the producers joining it, in joining order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub producers: Vec<ProducerConfig>,
}
