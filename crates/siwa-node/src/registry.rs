//! Identity allocation and lookup tables. Tables hold ids only; the entities
//! themselves live in the [`Orchestrator`](crate::Orchestrator).
use siwa_bls::poly::Idx;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Aggregator,
    Producer,
}

/// What the registry knows about a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub role: Role,
    /// The aggregator a producer belongs to; an aggregator is its own parent.
    pub parent: String,
    pub rank: u64,
    /// hex encoded public key
    pub public_key: String,
}

#[derive(Debug, Default)]
pub struct Registry {
    aggregator_counter: u64,
    producer_counters: HashMap<String, u64>,
    records: HashMap<String, Record>,
    by_index: HashMap<(String, Idx), String>,
    by_public_key: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `"{n}"`. Counters are never reused.
    pub fn next_aggregator_id(&mut self) -> String {
        let id = self.aggregator_counter.to_string();
        self.aggregator_counter += 1;
        id
    }

    /// Allocates `"{counter}.{aggregator_id}"` and returns the counter with
    /// it.
    pub fn next_producer_id(&mut self, aggregator_id: &str) -> (String, u64) {
        let counter = self
            .producer_counters
            .entry(aggregator_id.to_string())
            .or_insert(0);
        let n = *counter;
        *counter += 1;
        (format!("{}.{}", n, aggregator_id), n)
    }

    pub fn insert(&mut self, id: &str, record: Record) {
        self.by_public_key
            .insert(record.public_key.clone(), id.to_string());
        self.records.insert(id.to_string(), record);
    }

    /// Drops the participant from every table.
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        let record = self.records.remove(id)?;
        self.by_public_key.remove(&record.public_key);
        self.by_index.retain(|_, v| v != id);
        Some(record)
    }

    /// Replaces the index table of `aggregator_id` with `assignments`.
    pub fn reindex<'a, I>(&mut self, aggregator_id: &str, assignments: I)
    where
        I: IntoIterator<Item = (&'a str, Idx)>,
    {
        self.by_index.retain(|(agg, _), _| agg != aggregator_id);
        for (id, idx) in assignments {
            self.by_index
                .insert((aggregator_id.to_string(), idx), id.to_string());
        }
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn by_index(&self, aggregator_id: &str, idx: Idx) -> Option<&str> {
        self.by_index
            .get(&(aggregator_id.to_string(), idx))
            .map(String::as_str)
    }

    pub fn by_public_key(&self, public_key: &str) -> Option<&str> {
        self.by_public_key.get(public_key).map(String::as_str)
    }

    pub fn index_of(&self, id: &str) -> Option<Idx> {
        self.by_index
            .iter()
            .find(|(_, v)| v.as_str() == id)
            .map(|((_, idx), _)| *idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
