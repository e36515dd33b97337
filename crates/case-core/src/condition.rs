//! The condition evaluator.
//!
//! Evaluates boolean predicates over collected values and produces the
//! filtered subset of records that matched, paired with the originating
//! artifact ids. Sibling named conditions on the same upstream step are
//! evaluated independently; the evaluator does not enforce that they
//! partition; that is the graph author's contract. Zero matches yield an
//! empty set and the downstream branch is never scheduled.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collect::records_for;
use crate::errors::EngineError;
use crate::model::{Case, FilteredRecord, FilteredSet};
use crate::path::{DataPath, Field};
use crate::store::CaseStore;

/// External reference lists (e.g. the executive list), consulted by
/// membership only. `None` means the list itself does not exist.
pub trait NamedListStore: Send + Sync {
    fn contains(&self, list: &str, value: &str) -> Option<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    In,
    NotIn,
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operand {
    Literal(Value),
    /// Unordered cross-reference against every case artifact's named
    /// field; an `Eq` match records the matching artifact's id.
    ArtifactField(String),
    /// Membership test against a named external list.
    NamedList(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    pub left: DataPath,
    pub op: CmpOp,
    pub right: Operand,
}

impl Predicate {
    pub fn new(left: DataPath, op: CmpOp, right: Operand) -> Self {
        Self { left, op, right }
    }
}

/// Values compare equal when identical, or when their scalar string forms
/// coincide (the wire formats involved are not strict about types).
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (scalar_string(a), scalar_string(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn membership(lists: &dyn NamedListStore, list: &str, value: &Value) -> Result<bool, EngineError> {
    let Some(s) = scalar_string(value) else {
        return Ok(false);
    };
    lists.contains(list, &s)
         .ok_or_else(|| EngineError::UnknownList(list.to_string()))
}

/// Evaluates `predicates` (conjunction) against the records the first
/// predicate's left path addresses. All left paths must share scope+step.
pub fn evaluate(case: &Case,
                store: &CaseStore,
                lists: &dyn NamedListStore,
                predicates: &[Predicate])
                -> Result<FilteredSet, EngineError> {
    let Some(first) = predicates.first() else {
        return Ok(FilteredSet::default());
    };
    if predicates.iter()
                 .any(|p| p.left.scope != first.left.scope || p.left.step != first.left.step)
    {
        return Err(EngineError::MisalignedPaths);
    }

    let mut candidates: Vec<FilteredRecord> =
        records_for(store, &first.left.scope, &first.left.step)?.into_iter()
                                                                .map(|v| FilteredRecord { artifact_id: v.artifact,
                                                                                          parameter: v.parameter,
                                                                                          data: v.data,
                                                                                          summary: v.summary })
                                                                .collect();

    for predicate in predicates {
        candidates = apply(case, lists, candidates, predicate)?;
    }
    Ok(FilteredSet::new(candidates))
}

fn apply(case: &Case,
         lists: &dyn NamedListStore,
         candidates: Vec<FilteredRecord>,
         predicate: &Predicate)
         -> Result<Vec<FilteredRecord>, EngineError> {
    let mut kept = Vec::new();
    for record in candidates {
        match &predicate.left.field {
            Field::Data(name) => apply_per_row(case, lists, record, name, predicate, &mut kept)?,
            field => {
                let value = record_value(&record, field);
                apply_record(case, lists, &value, predicate, &mut kept, &record)?;
            }
        }
    }
    Ok(kept)
}

fn record_value(record: &FilteredRecord, field: &Field) -> Value {
    match field {
        Field::Parameter(name) => record.parameter.get(name).cloned().unwrap_or(Value::Null),
        Field::ContextArtifact => record.artifact_id.map(Value::from).unwrap_or(Value::Null),
        Field::Summary => record.summary.clone().unwrap_or(Value::Null),
        Field::Data(_) => Value::Null, // handled by apply_per_row
    }
}

/// Record-level predicates: the matched record is pushed whole; the
/// `Eq`-against-artifact case stamps the matching artifact's id on it.
fn apply_record(case: &Case,
                lists: &dyn NamedListStore,
                value: &Value,
                predicate: &Predicate,
                kept: &mut Vec<FilteredRecord>,
                record: &FilteredRecord)
                -> Result<(), EngineError> {
    match (&predicate.op, &predicate.right) {
        (CmpOp::Eq, Operand::Literal(lit)) => {
            if loose_eq(value, lit) {
                kept.push(record.clone());
            }
        }
        (CmpOp::Ne, Operand::Literal(lit)) => {
            if !loose_eq(value, lit) {
                kept.push(record.clone());
            }
        }
        (CmpOp::Eq, Operand::ArtifactField(field)) => {
            if let Some(artifact) = case.artifacts
                                        .iter()
                                        .find(|a| a.field(field).is_some_and(|f| loose_eq(value, f)))
            {
                let mut matched = record.clone();
                matched.artifact_id = Some(artifact.id);
                kept.push(matched);
            }
        }
        (CmpOp::Ne, Operand::ArtifactField(field)) => {
            let any = case.artifacts
                          .iter()
                          .any(|a| a.field(field).is_some_and(|f| loose_eq(value, f)));
            if !any {
                kept.push(record.clone());
            }
        }
        (CmpOp::In, Operand::NamedList(list)) => {
            if membership(lists, list, value)? {
                kept.push(record.clone());
            }
        }
        (CmpOp::NotIn, Operand::NamedList(list)) => {
            if !value.is_null() && !membership(lists, list, value)? {
                kept.push(record.clone());
            }
        }
        // Remaining op/operand combinations have no business meaning here.
        _ => {}
    }
    Ok(())
}

/// `Data` fields match row by row: the record is narrowed to the rows
/// that satisfied the predicate, one output record per matched row for
/// `Eq`-against-artifact so each match carries its own artifact id.
fn apply_per_row(case: &Case,
                 lists: &dyn NamedListStore,
                 record: FilteredRecord,
                 name: &str,
                 predicate: &Predicate,
                 kept: &mut Vec<FilteredRecord>)
                 -> Result<(), EngineError> {
    match (&predicate.op, &predicate.right) {
        (CmpOp::Eq, Operand::ArtifactField(field)) => {
            for row in &record.data {
                let value = row.get(name).cloned().unwrap_or(Value::Null);
                if let Some(artifact) = case.artifacts
                                            .iter()
                                            .find(|a| a.field(field).is_some_and(|f| loose_eq(&value, f)))
                {
                    kept.push(FilteredRecord { artifact_id: Some(artifact.id),
                                               parameter: record.parameter.clone(),
                                               data: vec![row.clone()],
                                               summary: record.summary.clone() });
                }
            }
        }
        (CmpOp::Ne, Operand::ArtifactField(field)) => {
            let rows: Vec<Value> = record.data
                                         .iter()
                                         .filter(|row| {
                                             let value = row.get(name).cloned().unwrap_or(Value::Null);
                                             !case.artifacts
                                                  .iter()
                                                  .any(|a| a.field(field).is_some_and(|f| loose_eq(&value, f)))
                                         })
                                         .cloned()
                                         .collect();
            if !rows.is_empty() {
                kept.push(FilteredRecord { data: rows, ..record });
            }
        }
        _ => {
            let mut rows = Vec::new();
            for row in &record.data {
                let value = row.get(name).cloned().unwrap_or(Value::Null);
                let keep = match (&predicate.op, &predicate.right) {
                    (CmpOp::Eq, Operand::Literal(lit)) => loose_eq(&value, lit),
                    (CmpOp::Ne, Operand::Literal(lit)) => !loose_eq(&value, lit),
                    (CmpOp::In, Operand::NamedList(list)) => membership(lists, list, &value)?,
                    (CmpOp::NotIn, Operand::NamedList(list)) => {
                        !value.is_null() && !membership(lists, list, &value)?
                    }
                    _ => false,
                };
                if keep {
                    rows.push(row.clone());
                }
            }
            if !rows.is_empty() {
                kept.push(FilteredRecord { data: rows, ..record });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionRecord, ActionResult, CaseArtifact};
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    struct Lists(HashMap<String, HashSet<String>>);

    impl NamedListStore for Lists {
        fn contains(&self, list: &str, value: &str) -> Option<bool> {
            self.0.get(list).map(|set| set.contains(value))
        }
    }

    fn executives() -> Lists {
        let mut lists = HashMap::new();
        lists.insert("executives".to_string(),
                     HashSet::from(["u2".to_string(), "u9".to_string()]));
        Lists(lists)
    }

    fn case_with_device(external_id: &str) -> Case {
        Case::new(vec![CaseArtifact::new(11, json!({ "deviceExternalId": external_id }))])
    }

    fn device_store() -> CaseStore {
        let mut store = CaseStore::new();
        let result = ActionResult { parameter: json!({"limit": 500000}),
                                    data: vec![json!({"uuid": "U1", "userId": "u1"}),
                                               json!({"uuid": "U2", "userId": "u2"})],
                                    success: true,
                                    message: None,
                                    context_artifact: None };
        store.put_action(ActionRecord::new("list_mobile_devices", "mdm", "list devices", vec![result]))
             .unwrap();
        store
    }

    fn attributes_store() -> CaseStore {
        let mut store = CaseStore::new();
        let results = ["u1", "u2"].iter()
                                  .map(|u| ActionResult { parameter: json!({"username": u}),
                                                          data: vec![],
                                                          success: true,
                                                          message: None,
                                                          context_artifact: Some(11) })
                                  .collect();
        store.put_action(ActionRecord::new("get_user_attributes", "directory", "get user attributes", results))
             .unwrap();
        store
    }

    #[test]
    fn artifact_cross_reference_narrows_and_records_artifact_id() {
        let case = case_with_device("U1");
        let store = device_store();
        let set = evaluate(&case,
                           &store,
                           &executives(),
                           &[Predicate::new(DataPath::direct("list_mobile_devices", Field::Data("uuid".into())),
                                            CmpOp::Eq,
                                            Operand::ArtifactField("deviceExternalId".into()))]).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.records[0].data, vec![json!({"uuid": "U1", "userId": "u1"})]);
        assert_eq!(set.artifact_ids(), vec![11]);
    }

    #[test]
    fn no_match_yields_empty_set() {
        let case = case_with_device("U9");
        let store = device_store();
        let set = evaluate(&case,
                           &store,
                           &executives(),
                           &[Predicate::new(DataPath::direct("list_mobile_devices", Field::Data("uuid".into())),
                                            CmpOp::Eq,
                                            Operand::ArtifactField("deviceExternalId".into()))]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn membership_conditions_partition_the_input() {
        let case = case_with_device("U1");
        let store = attributes_store();
        let left = || DataPath::direct("get_user_attributes", Field::Parameter("username".into()));

        let non_exec = evaluate(&case,
                                &store,
                                &executives(),
                                &[Predicate::new(left(), CmpOp::NotIn, Operand::NamedList("executives".into()))]).unwrap();
        let exec = evaluate(&case,
                            &store,
                            &executives(),
                            &[Predicate::new(left(), CmpOp::In, Operand::NamedList("executives".into()))]).unwrap();

        assert_eq!(non_exec.len(), 1);
        assert_eq!(non_exec.records[0].parameter, json!({"username": "u1"}));
        assert_eq!(exec.len(), 1);
        assert_eq!(exec.records[0].parameter, json!({"username": "u2"}));
        let total = store.action("get_user_attributes").unwrap().results.len();
        assert_eq!(non_exec.len() + exec.len(), total);
    }

    #[test]
    fn unknown_list_is_an_error_not_a_silent_miss() {
        let case = case_with_device("U1");
        let store = attributes_store();
        let err = evaluate(&case,
                           &store,
                           &executives(),
                           &[Predicate::new(DataPath::direct("get_user_attributes",
                                                             Field::Parameter("username".into())),
                                            CmpOp::In,
                                            Operand::NamedList("board_members".into()))]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownList(name) if name == "board_members"));
    }

    #[test]
    fn literal_equality_is_loose_across_scalar_forms() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(!loose_eq(&json!(1), &json!("2")));
        assert!(loose_eq(&json!("u1"), &json!("u1")));
    }
}
