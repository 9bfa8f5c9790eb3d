use serde_json::{Map, Value};

use crate::error::Result;

/// A decoded structured record: an ordered mapping of field name to JSON value.
pub type StructuredRecord = Map<String, Value>;

/// One record flowing through the pipeline: either an opaque text line or a
/// structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    RawText(String),
    Structured(StructuredRecord),
}

impl Record {
    /// Parse a text line into a structured record. The line must be one JSON
    /// object.
    pub fn parse_structured(line: &str) -> Result<StructuredRecord> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn into_structured(self) -> Option<StructuredRecord> {
        match self {
            Self::Structured(map) => Some(map),
            Self::RawText(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&StructuredRecord> {
        match self {
            Self::Structured(map) => Some(map),
            Self::RawText(_) => None,
        }
    }

    /// Serialize as one line of JSON-lines output. Raw text passes through
    /// verbatim; structured records become compact JSON.
    pub fn to_json_line(&self) -> Result<String> {
        match self {
            Self::RawText(line) => Ok(line.clone()),
            Self::Structured(map) => Ok(serde_json::to_string(map)?),
        }
    }
}

impl From<StructuredRecord> for Record {
    fn from(map: StructuredRecord) -> Self {
        Self::Structured(map)
    }
}

/// Whether every key predicate must hold or at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    All,
    Any,
}

/// Ordered multi-key filter: each entry pairs a field name with its allowed
/// values. A record missing a key never matches that key's predicate.
#[derive(Debug, Clone)]
pub struct KeyFilterSpec {
    pub filters: Vec<(String, Vec<Value>)>,
    pub mode: FilterMode,
}

impl KeyFilterSpec {
    pub fn new(filters: Vec<(String, Vec<Value>)>, mode: FilterMode) -> Self {
        Self { filters, mode }
    }

    /// Evaluate the key predicates in order and combine them per the mode.
    pub fn matches(&self, record: &StructuredRecord) -> bool {
        let mut checks = self.filters.iter().map(|(key, allowed)| {
            record
                .get(key)
                .map(|value| allowed.contains(value))
                .unwrap_or(false)
        });
        match self.mode {
            FilterMode::All => checks.all(|ok| ok),
            FilterMode::Any => checks.any(|ok| ok),
        }
    }
}
