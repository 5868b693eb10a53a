//! Key-value backends answering the producers' queries.
use serde_json::Value;
use std::{collections::HashMap, fmt::Debug, fs, io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("empty expression")]
    EmptyExpression,
    #[error("could not read backend: {0}")]
    Io(#[from] io::Error),
    #[error("could not parse backend: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend entry {0} is not a string")]
    NotAString(String),
}

/// Evaluates an expression against a backend. A missing key evaluates to
/// the empty string.
pub trait Querier: Debug + Send + Sync {
    fn query(&self, expression: &str) -> Result<String, QueryError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryQuerier {
    entries: HashMap<String, String>,
}

impl MemoryQuerier {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl Querier for MemoryQuerier {
    fn query(&self, expression: &str) -> Result<String, QueryError> {
        lookup(&self.entries, expression)
    }
}

/// A flat JSON object of string pairs, loaded once.
#[derive(Debug, Clone)]
pub struct JsonFileQuerier {
    entries: HashMap<String, String>,
}

impl JsonFileQuerier {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, QueryError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, QueryError> {
        let object: HashMap<String, Value> = serde_json::from_str(raw)?;
        let entries = object
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k, s)),
                _ => Err(QueryError::NotAString(k)),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { entries })
    }
}

impl Querier for JsonFileQuerier {
    fn query(&self, expression: &str) -> Result<String, QueryError> {
        lookup(&self.entries, expression)
    }
}

fn lookup(entries: &HashMap<String, String>, expression: &str) -> Result<String, QueryError> {
    let key = expression.trim();
    if key.is_empty() {
        return Err(QueryError::EmptyExpression);
    }
    Ok(entries.get(key).cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_hit_and_miss() {
        let mut q = MemoryQuerier::default();
        q.insert("k1", "v1");
        assert_eq!(q.query("k1").unwrap(), "v1");
        assert_eq!(q.query(" k1 ").unwrap(), "v1");
        assert_eq!(q.query("k2").unwrap(), "");
        match q.query("  ").unwrap_err() {
            QueryError::EmptyExpression => {}
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn json_backend() {
        let q = JsonFileQuerier::from_json(r#"{"k1": "v1", "k2": "v2"}"#).unwrap();
        assert_eq!(q.query("k2").unwrap(), "v2");
        assert_eq!(q.query("k3").unwrap(), "");

        JsonFileQuerier::from_json(r#"{"k1": 1}"#).unwrap_err();
        JsonFileQuerier::from_json("[]").unwrap_err();
    }

    #[test]
    fn json_backend_from_file() {
        let path = std::env::temp_dir().join(format!("siwa-querier-{}.json", std::process::id()));
        fs::write(&path, r#"{"k1": "v1"}"#).unwrap();
        let q = JsonFileQuerier::open(&path).unwrap();
        assert_eq!(q.query("k1").unwrap(), "v1");
        fs::remove_file(&path).unwrap();

        JsonFileQuerier::open(&path).unwrap_err();
    }
}
