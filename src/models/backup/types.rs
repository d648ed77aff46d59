use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::errors::BackupError;
use crate::store::Record;

use super::schema;

pub const SNAPSHOT_VERSION: &str = "1.0";

/// The portable export document. `data` maps collection name to its records
/// in original fetch order (creation time ascending).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_by_email: String,
    #[serde(serialize_with = "ordered_collections")]
    pub data: HashMap<String, Vec<Record>>,
}

/// Serialize `data` keys in the fixed restore order, unknown collections
/// last. The restore side iterates the schema table, not the document, but
/// the document invariant is that collections appear leaves-first.
fn ordered_collections<S: Serializer>(
    data: &HashMap<String, Vec<Record>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(data.len()))?;
    for spec in schema::COLLECTIONS {
        if let Some(records) = data.get(spec.name) {
            map.serialize_entry(spec.name, records)?;
        }
    }
    let mut extra: Vec<&String> = data
        .keys()
        .filter(|name| schema::spec_for(name).is_none())
        .collect();
    extra.sort();
    for name in extra {
        map.serialize_entry(name, &data[name.as_str()])?;
    }
    map.end()
}

/// What the confirmation dialog shows before a restore is allowed to start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub created_at: String,
    pub created_by_email: String,
    pub collections: usize,
    pub records: usize,
}

impl Snapshot {
    /// Parse a snapshot document. Rejects any input whose top-level `data`
    /// is absent or not an object — fatal, before any mutation.
    pub fn from_json(text: &str) -> Result<Self, BackupError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| BackupError::SnapshotFormat(format!("not valid JSON: {e}")))?;
        let Some(root) = value.as_object() else {
            return Err(BackupError::SnapshotFormat("top level is not an object".into()));
        };
        match root.get("data") {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(BackupError::SnapshotFormat("'data' is not an object".into()));
            }
            None => return Err(BackupError::SnapshotFormat("missing 'data' field".into())),
        }
        let snapshot: Snapshot = serde_json::from_value(value)
            .map_err(|e| BackupError::SnapshotFormat(e.to_string()))?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, BackupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            created_at: self.created_at.clone(),
            created_by_email: self.created_by_email.clone(),
            collections: self.data.len(),
            records: self.data.values().map(Vec::len).sum(),
        }
    }
}

/// Old-id to new-id translation table, scoped to a single restore run.
/// Threaded through the orchestration explicitly; never module state, never
/// persisted.
#[derive(Debug, Default)]
pub struct IdMap {
    entries: HashMap<(String, String), String>,
}

impl IdMap {
    pub fn new() -> Self {
        IdMap::default()
    }

    pub fn record(&mut self, collection: &str, old_id: &str, new_id: &str) {
        self.entries
            .insert((collection.to_string(), old_id.to_string()), new_id.to_string());
    }

    pub fn resolve(&self, collection: &str, old_id: &str) -> Option<&str> {
        self.entries
            .get(&(collection.to_string(), old_id.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-collection restore result: how many records went in, how many were
/// rejected, and why.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionOutcome {
    pub collection: String,
    pub restored: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Every processed record was written.
    Complete,
    /// Some records were written, some rejected.
    Partial,
    /// Nothing was written and at least one record was rejected.
    Failed,
}

/// End-of-run summary. There is no rollback: collections listed here with
/// errors keep whatever was successfully written before the failures.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    pub collections: Vec<CollectionOutcome>,
}

impl RestoreReport {
    pub fn total_restored(&self) -> usize {
        self.collections.iter().map(|c| c.restored).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.collections.iter().map(|c| c.failed).sum()
    }

    pub fn outcome(&self) -> RestoreOutcome {
        if self.total_failed() == 0 {
            RestoreOutcome::Complete
        } else if self.total_restored() > 0 {
            RestoreOutcome::Partial
        } else {
            RestoreOutcome::Failed
        }
    }

    /// Collections that reported at least one rejected record.
    pub fn failed_collections(&self) -> Vec<&CollectionOutcome> {
        self.collections.iter().filter(|c| c.failed > 0).collect()
    }
}
