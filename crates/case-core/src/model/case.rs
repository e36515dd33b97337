//! The case: the top-level unit of work.
//!
//! A case holds the immutable input artifacts of one reported incident
//! plus a lifecycle status. Exactly one workflow graph executes per case;
//! everything the steps accumulate lives in the per-run `CaseStore`, not
//! here, so the case itself stays small and serializable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Case lifecycle. Valid transitions:
/// - `Open` -> `Closing` (the terminal join barrier fired)
/// - `Closing` -> `Closed` (the close step ran)
///
/// No reversals; a case is closed at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    Open,
    Closing,
    Closed,
}

/// An immutable input fact attached to a case.
///
/// The numeric id is the correlation "context": downstream requests carry
/// it so every collaborator result can be traced back to the artifact that
/// triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseArtifact {
    pub id: u64,
    pub fields: Value,
}

impl CaseArtifact {
    pub fn new(id: u64, fields: Value) -> Self {
        Self { id, fields }
    }

    /// Looks up a named field (e.g. `deviceExternalId`).
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub status: CaseStatus,
    pub artifacts: Vec<CaseArtifact>,
}

impl Case {
    pub fn new(artifacts: Vec<CaseArtifact>) -> Self {
        Self { id: Uuid::new_v4(),
               status: CaseStatus::Open,
               artifacts }
    }

    pub fn is_closed(&self) -> bool {
        self.status == CaseStatus::Closed
    }
}
