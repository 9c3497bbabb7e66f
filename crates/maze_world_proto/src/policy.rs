//! Canonical serialization of a learned policy.
//!
//! A policy is the full weight table of the linear Q-approximation: one row
//! of feature weights per behavior, keyed by the behavior's stable name.
//! This is the unit of learning transfer across episodes and processes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MazeError;
use crate::wire::to_canonical_cbor;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyTable {
    pub weights: BTreeMap<String, Vec<f64>>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, behavior: impl Into<String>, row: Vec<f64>) {
        self.weights.insert(behavior.into(), row);
    }

    pub fn behavior_names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// Hex blake3 digest over the canonical encoding. Two tables with equal
    /// weights always digest identically, regardless of construction order.
    pub fn digest(&self) -> Result<String, MazeError> {
        let bytes = to_canonical_cbor(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    /// Human-readable snapshot for persistence alongside the CBOR wire form.
    pub fn to_json(&self) -> Result<String, MazeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, MazeError> {
        Ok(serde_json::from_str(json)?)
    }
}
