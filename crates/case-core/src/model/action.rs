//! Step invocation records.
//!
//! One `ActionRecord` is written per action step per case run, after the
//! whole fan-out resolved. Records are immutable once stored (the store
//! enforces write-once per step name).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One outbound request of an action step's fan-out. `params` is the
/// business parameter object; `context_artifact` is the id of the case
/// artifact the parameters were derived from, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub params: Value,
    pub context_artifact: Option<u64>,
}

/// The terminal outcome of one request. Failure is terminal for the
/// request but never aborts the workflow; it is recorded and counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Echo of the request parameters (readable later via
    /// `Field::Parameter`).
    pub parameter: Value,
    /// Result rows returned by the collaborator (readable via
    /// `Field::Data`).
    pub data: Vec<Value>,
    pub success: bool,
    pub message: Option<String>,
    pub context_artifact: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub step: String,
    pub connector: String,
    pub operation: String,
    pub results: Vec<ActionResult>,
    /// True when every request in the fan-out succeeded.
    pub success: bool,
}

impl ActionRecord {
    pub fn new(step: &str, connector: &str, operation: &str, results: Vec<ActionResult>) -> Self {
        let success = results.iter().all(|r| r.success);
        Self { step: step.to_string(),
               connector: connector.to_string(),
               operation: operation.to_string(),
               results,
               success }
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}
