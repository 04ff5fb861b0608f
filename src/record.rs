//! The schema-less attribute map ingested records are represented as.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single attribute value: either a finite number, or null.
///
/// Non-numeric source values (strings, booleans as text, etc.) are never
/// represented here, they are dropped during ingest instead of being
/// carried around as an unrepresentable variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Null,
}

impl Value {
    /// The numeric value, if present and finite.
    pub fn as_finite(&self) -> Option<f64> {
        match self {
            Value::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

/// A schema-less attribute map keyed by string. Required geometric keys are
/// `lat` and `lon`; all other keys are dataset-specific.
pub type Record = HashMap<String, Value>;

/// Read `lat`/`lon` out of a record, if both are present and numeric.
pub fn lon_lat(record: &Record) -> Option<(f64, f64)> {
    let lon = record.get("lon")?.as_finite()?;
    let lat = record.get("lat")?.as_finite()?;
    Some((lon, lat))
}
