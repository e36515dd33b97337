//! The data collector.
//!
//! Given prior step results and a set of paths, produces the aligned
//! tuples of values needed to build the next step's parameters. All paths
//! of one `collect` call must address the same scope and step; that is
//! what makes the tuples line up record by record. `Data` fields flatten
//! result rows; `Parameter` and `ContextArtifact` fields repeat per row.
//!
//! Callers act on a tuple only when its first value is truthy; by
//! convention the last path carries the originating artifact id, which is
//! propagated into the next request's context rather than its business
//! parameters.

use serde_json::Value;

use crate::errors::EngineError;
use crate::model::PromptStatus;
use crate::path::{DataPath, Field, Scope};
use crate::store::CaseStore;

/// A uniform read view over action results, filtered records and prompt
/// records.
pub(crate) struct RecordView {
    pub artifact: Option<u64>,
    pub parameter: Value,
    pub data: Vec<Value>,
    pub summary: Option<Value>,
}

/// Resolves the records a scope+step pair addresses.
pub(crate) fn records_for(store: &CaseStore, scope: &Scope, step: &str) -> Result<Vec<RecordView>, EngineError> {
    match scope {
        Scope::Filtered { filter, condition } => {
            let set = store.filtered(filter, condition)
                           .ok_or_else(|| EngineError::UnresolvedPath(format!("filtered-data:{filter}:{condition}:{step}")))?;
            Ok(set.records
                  .iter()
                  .map(|r| RecordView { artifact: r.artifact_id,
                                        parameter: r.parameter.clone(),
                                        data: r.data.clone(),
                                        summary: r.summary.clone() })
                  .collect())
        }
        Scope::Direct => {
            if let Some(record) = store.action(step) {
                return Ok(record.results
                                .iter()
                                .map(|r| RecordView { artifact: r.context_artifact,
                                                      parameter: r.parameter.clone(),
                                                      data: r.data.clone(),
                                                      summary: None })
                                .collect());
            }
            if let Some(prompt) = store.prompt(step) {
                let summary = match prompt.status {
                    PromptStatus::Answered => prompt.answer.map(Value::from),
                    _ => None,
                };
                return Ok(vec![RecordView { artifact: None,
                                            parameter: serde_json::json!({
                                                "respondent": prompt.respondent,
                                                "message": prompt.message,
                                            }),
                                            data: vec![],
                                            summary }]);
            }
            Err(EngineError::UnresolvedPath(step.to_string()))
        }
    }
}

fn extract(view: &RecordView, data_row: Option<&Value>, field: &Field) -> Value {
    match field {
        Field::Parameter(name) => view.parameter.get(name).cloned().unwrap_or(Value::Null),
        Field::Data(name) => data_row.and_then(|row| row.get(name)).cloned().unwrap_or(Value::Null),
        Field::ContextArtifact => view.artifact.map(Value::from).unwrap_or(Value::Null),
        Field::Summary => view.summary.clone().unwrap_or(Value::Null),
    }
}

/// Collects aligned value tuples, one per underlying record (or per data
/// row when any path drills into `data`).
pub fn collect(store: &CaseStore, paths: &[DataPath]) -> Result<Vec<Vec<Value>>, EngineError> {
    let Some(first) = paths.first() else {
        return Ok(vec![]);
    };
    if paths.iter().any(|p| p.scope != first.scope || p.step != first.step) {
        return Err(EngineError::MisalignedPaths);
    }

    let records = records_for(store, &first.scope, &first.step)?;
    let needs_data = paths.iter().any(|p| matches!(p.field, Field::Data(_)));

    let mut rows = Vec::new();
    for view in &records {
        if needs_data {
            for data_row in &view.data {
                rows.push(paths.iter().map(|p| extract(view, Some(data_row), &p.field)).collect());
            }
        } else {
            rows.push(paths.iter().map(|p| extract(view, None, &p.field)).collect());
        }
    }
    Ok(rows)
}

/// Resolves a single path to its first value, `Null` when nothing matched.
/// This is the policy formatters and prompts use for multi-valued paths.
pub fn resolve_first(store: &CaseStore, path: &DataPath) -> Result<Value, EngineError> {
    let rows = collect(store, std::slice::from_ref(path))?;
    Ok(rows.into_iter()
           .flat_map(|row| row.into_iter())
           .find(|v| !v.is_null())
           .unwrap_or(Value::Null))
}

/// A tuple is only acted upon when its primary value is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
