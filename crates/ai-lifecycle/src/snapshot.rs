use std::collections::BTreeMap;

use ai_core::{LogicalName, Vec3};
use ai_goals::{ARCHETYPE, CURRENT_GOAL};
use ai_memory::{CellValue, Field, FieldSpec, MemoryValue, Persistence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SnapshotError;

/// At-rest capture of an agent's persistent fields, keyed by logical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    pub logical_name: LogicalName,
    pub position: Vec3,
    pub captured_tick: u64,
    pub captured_at: DateTime<Utc>,
    pub fields: BTreeMap<String, CellValue>,
}

impl SerializedSnapshot {
    pub fn encode(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    pub fn decode(blob: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(blob).map_err(SnapshotError::Decode)?;
        if snapshot.logical_name.as_str().is_empty() {
            return Err(SnapshotError::MissingName);
        }
        Ok(snapshot)
    }

    pub fn field(&self, name: &str) -> Option<&CellValue> {
        self.fields.get(name)
    }
}

/// The fixed set of persistent fields carried through a snapshot.
///
/// Always includes the archetype and goal id so a restored agent keeps its
/// behavior category and resumes its goal.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSchema {
    fields: Vec<FieldSpec>,
}

impl Default for SnapshotSchema {
    fn default() -> Self {
        Self {
            fields: vec![ARCHETYPE.spec(), CURRENT_GOAL.spec()],
        }
    }
}

impl SnapshotSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a persistent field. Transient fields are rejected with a warning.
    pub fn field<T: MemoryValue>(mut self, field: Field<T>) -> Self {
        if field.persistence() != Persistence::Persistent {
            tracing::warn!(field = field.name(), "transient field cannot be snapshotted");
            return self;
        }
        if self.fields.iter().all(|f| f.name != field.name()) {
            self.fields.push(field.spec());
        }
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}
