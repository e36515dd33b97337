//! Scoped data references.
//!
//! A `DataPath` names one result location: a step, an optional filter
//! qualification, and a field. The scope chain is the traceability
//! invariant made structural: a downstream step can only reference
//! upstream data through the exact condition that validated it, and the
//! reference is checked when the graph is built instead of parsed from a
//! string at run time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the records come from: the step's own invocation record, or the
/// subset a named filter condition let through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Direct,
    Filtered { filter: String, condition: String },
}

/// Which value is drawn from each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// A named field of the request parameter echo.
    Parameter(String),
    /// A named field of each result data row (flattens the rows).
    Data(String),
    /// The originating artifact id carried in the request context.
    ContextArtifact,
    /// The recorded prompt answer.
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPath {
    pub scope: Scope,
    pub step: String,
    pub field: Field,
}

impl DataPath {
    pub fn direct(step: &str, field: Field) -> Self {
        Self { scope: Scope::Direct,
               step: step.to_string(),
               field }
    }

    pub fn filtered(filter: &str, condition: &str, step: &str, field: Field) -> Self {
        Self { scope: Scope::Filtered { filter: filter.to_string(),
                                        condition: condition.to_string() },
               step: step.to_string(),
               field }
    }
}

impl fmt::Display for DataPath {
    /// Renders the legacy colon-separated form for logs and errors.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match &self.field {
            Field::Parameter(name) => format!("parameter.{name}"),
            Field::Data(name) => format!("data.*.{name}"),
            Field::ContextArtifact => "parameter.context.artifact_id".to_string(),
            Field::Summary => "summary.response".to_string(),
        };
        match &self.scope {
            Scope::Direct => write!(f, "{}:{}", self.step, field),
            Scope::Filtered { filter, condition } => {
                write!(f, "filtered-data:{}:{}:{}:{}", filter, condition, self.step, field)
            }
        }
    }
}
