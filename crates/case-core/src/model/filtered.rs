//! Filtered result sets.
//!
//! The output of one named condition of a filter step: an ordered sequence
//! of (matched artifact id, narrowed result) pairs. Downstream branches
//! read upstream data exclusively through these sets, never through the
//! unfiltered record, so a value only reaches a branch via the condition
//! chain that validated it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ActionResult;

/// One matched record. `data` holds only the rows that satisfied the
/// condition; `artifact_id` is the case artifact the match traces back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredRecord {
    pub artifact_id: Option<u64>,
    pub parameter: Value,
    pub data: Vec<Value>,
    pub summary: Option<Value>,
}

impl FilteredRecord {
    pub fn from_result(result: &ActionResult) -> Self {
        Self { artifact_id: result.context_artifact,
               parameter: result.parameter.clone(),
               data: result.data.clone(),
               summary: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteredSet {
    pub records: Vec<FilteredRecord>,
}

impl FilteredSet {
    pub fn new(records: Vec<FilteredRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids of the artifacts the matches trace back to, in match order.
    pub fn artifact_ids(&self) -> Vec<u64> {
        self.records.iter().filter_map(|r| r.artifact_id).collect()
    }
}
