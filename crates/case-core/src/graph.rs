//! The workflow graph: an explicit step registry.
//!
//! Each step names its successors instead of hardcoding control flow, so
//! the topology is data and can be validated when it is built: every
//! referenced name must resolve, the graph must be acyclic, and every
//! member a join barrier waits on must be reachable from the entry, so
//! the class of deadlock where a join waits for a step no branch can ever
//! schedule is rejected up front.
//!
//! Branching stays entirely data-driven: filters route on matched
//! records, decisions route on the recorded prompt answer. The graph is
//! fixed at build time; no step is created dynamically.

use std::collections::HashSet;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::condition::Predicate;
use crate::path::{DataPath, Scope};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("entry step not present: {0}")]
    MissingEntry(String),
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),
    #[error("step {step} names unknown successor {next}")]
    UnknownSuccessor { step: String, next: String },
    #[error("join {join} requires unknown step {step}")]
    UnknownJoinInput { join: String, step: String },
    #[error("join {join} requires step {step}, which is unreachable from the entry")]
    UnreachableJoinInput { join: String, step: String },
    #[error("decision {step} must reference a prompt step")]
    DecisionWithoutPrompt { step: String },
    #[error("step {step} references unknown step {referenced} in a data path")]
    UnknownPathStep { step: String, referenced: String },
    #[error("step {step} references unknown condition {filter}:{condition}")]
    UnknownCondition {
        step: String,
        filter: String,
        condition: String,
    },
    #[error("cycle detected at step {0}")]
    CycleDetected(String),
}

/// How an action step builds its parameter sets.
#[derive(Debug, Clone)]
pub enum ParamSpec {
    /// Fixed parameter objects, one request each (source steps).
    Static(Vec<Value>),
    /// One request per collected tuple.
    Collected(CollectSpec),
}

/// Parameter construction from collected tuples. Tuples whose first value
/// is not truthy are skipped; when the last path is the context artifact
/// id it is propagated into the request context, not the parameters.
#[derive(Debug, Clone)]
pub struct CollectSpec {
    pub paths: Vec<DataPath>,
    /// (parameter field, tuple index) bindings.
    pub bind: Vec<(String, usize)>,
    /// Fixed parameter fields merged into every request.
    pub consts: Vec<(String, Value)>,
}

#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub connector: String,
    pub operation: String,
    pub params: ParamSpec,
    /// (parameter field, formatted artifact name), resolved from the
    /// store at dispatch time and merged into every request.
    pub formatted: Vec<(String, String)>,
    pub next: Vec<String>,
}

/// One named condition of a filter step and the branch it feeds.
#[derive(Debug, Clone)]
pub struct ConditionSpec {
    pub name: String,
    pub predicates: Vec<Predicate>,
    pub next: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub conditions: Vec<ConditionSpec>,
}

#[derive(Debug, Clone)]
pub struct FormatSpec {
    pub template: String,
    pub paths: Vec<DataPath>,
    pub next: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PromptSpec {
    pub respondent: String,
    pub message: String,
    pub paths: Vec<DataPath>,
    pub min: i64,
    pub max: i64,
    pub timeout: Duration,
    pub next: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DecisionArm {
    pub response: i64,
    pub next: Vec<String>,
}

/// Routes on the answer recorded by a prompt step. Arms that do not
/// match (including the no-answer case) have their branches pruned.
#[derive(Debug, Clone)]
pub struct DecisionSpec {
    pub prompt: String,
    pub arms: Vec<DecisionArm>,
}

#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub requires: Vec<String>,
    pub next: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum StepSpec {
    Action(ActionSpec),
    Filter(FilterSpec),
    Format(FormatSpec),
    Prompt(PromptSpec),
    Decision(DecisionSpec),
    Join(JoinSpec),
    /// Terminal step: closes the case. No successors.
    Close,
}

impl StepSpec {
    pub fn successors(&self) -> Vec<&str> {
        match self {
            StepSpec::Action(s) => s.next.iter().map(String::as_str).collect(),
            StepSpec::Filter(s) => s.conditions
                                    .iter()
                                    .flat_map(|c| c.next.iter().map(String::as_str))
                                    .collect(),
            StepSpec::Format(s) => s.next.iter().map(String::as_str).collect(),
            StepSpec::Prompt(s) => s.next.iter().map(String::as_str).collect(),
            StepSpec::Decision(s) => s.arms
                                      .iter()
                                      .flat_map(|a| a.next.iter().map(String::as_str))
                                      .collect(),
            StepSpec::Join(s) => s.next.iter().map(String::as_str).collect(),
            StepSpec::Close => Vec::new(),
        }
    }

    fn data_paths(&self) -> Vec<&DataPath> {
        match self {
            StepSpec::Action(s) => match &s.params {
                ParamSpec::Collected(c) => c.paths.iter().collect(),
                ParamSpec::Static(_) => Vec::new(),
            },
            StepSpec::Filter(s) => s.conditions
                                    .iter()
                                    .flat_map(|c| c.predicates.iter().map(|p| &p.left))
                                    .collect(),
            StepSpec::Format(s) => s.paths.iter().collect(),
            StepSpec::Prompt(s) => s.paths.iter().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct WorkflowGraph {
    entry: String,
    steps: IndexMap<String, StepSpec>,
}

impl WorkflowGraph {
    /// Builds the graph and runs every static check. A graph that
    /// validates here cannot dangle a reference or deadlock a join at
    /// run time.
    pub fn validated(entry: &str, steps: Vec<(String, StepSpec)>) -> Result<Self, GraphError> {
        let mut map: IndexMap<String, StepSpec> = IndexMap::with_capacity(steps.len());
        for (name, spec) in steps {
            if map.insert(name.clone(), spec).is_some() {
                return Err(GraphError::DuplicateStep(name));
            }
        }
        let graph = Self { entry: entry.to_string(), steps: map };
        graph.validate()?;
        Ok(graph)
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn step(&self, name: &str) -> Option<&StepSpec> {
        self.steps.get(name)
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn joins(&self) -> impl Iterator<Item = (&str, &JoinSpec)> {
        self.steps.iter().filter_map(|(name, spec)| match spec {
                             StepSpec::Join(join) => Some((name.as_str(), join)),
                             _ => None,
                         })
    }

    fn validate(&self) -> Result<(), GraphError> {
        if !self.steps.contains_key(&self.entry) {
            return Err(GraphError::MissingEntry(self.entry.clone()));
        }

        for (name, spec) in &self.steps {
            for next in spec.successors() {
                if !self.steps.contains_key(next) {
                    return Err(GraphError::UnknownSuccessor { step: name.clone(),
                                                              next: next.to_string() });
                }
            }
            if let StepSpec::Decision(decision) = spec {
                match self.steps.get(&decision.prompt) {
                    Some(StepSpec::Prompt(_)) => {}
                    _ => return Err(GraphError::DecisionWithoutPrompt { step: name.clone() }),
                }
            }
            if let StepSpec::Join(join) = spec {
                for required in &join.requires {
                    if !self.steps.contains_key(required) {
                        return Err(GraphError::UnknownJoinInput { join: name.clone(),
                                                                  step: required.clone() });
                    }
                }
            }
            for path in spec.data_paths() {
                if !self.steps.contains_key(&path.step) {
                    return Err(GraphError::UnknownPathStep { step: name.clone(),
                                                             referenced: path.step.clone() });
                }
                if let Scope::Filtered { filter, condition } = &path.scope {
                    match self.steps.get(filter) {
                        Some(StepSpec::Filter(fs)) if fs.conditions.iter().any(|c| &c.name == condition) => {}
                        _ => {
                            return Err(GraphError::UnknownCondition { step: name.clone(),
                                                                      filter: filter.clone(),
                                                                      condition: condition.clone() });
                        }
                    }
                }
            }
        }

        self.check_acyclic()?;

        let reachable = self.reachable_from_entry();
        for (name, join) in self.joins() {
            for required in &join.requires {
                if !reachable.contains(required.as_str()) {
                    return Err(GraphError::UnreachableJoinInput { join: name.to_string(),
                                                                  step: required.clone() });
                }
            }
        }
        Ok(())
    }

    fn reachable_from_entry(&self) -> HashSet<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack = vec![self.entry.as_str()];
        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(spec) = self.steps.get(name) {
                stack.extend(spec.successors());
            }
        }
        seen
    }

    fn check_acyclic(&self) -> Result<(), GraphError> {
        // Iterative DFS with an explicit on-path set.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: IndexMap<&str, Mark> = IndexMap::new();
        for start in self.steps.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            let mut stack: Vec<(&str, bool)> = vec![(start.as_str(), false)];
            while let Some((name, expanded)) = stack.pop() {
                if expanded {
                    marks.insert(name, Mark::Done);
                    continue;
                }
                match marks.get(name) {
                    Some(Mark::Done) => continue,
                    Some(Mark::Visiting) => return Err(GraphError::CycleDetected(name.to_string())),
                    None => {}
                }
                marks.insert(name, Mark::Visiting);
                stack.push((name, true));
                if let Some(spec) = self.steps.get(name) {
                    for next in spec.successors() {
                        match marks.get(next) {
                            Some(Mark::Visiting) => return Err(GraphError::CycleDetected(next.to_string())),
                            Some(Mark::Done) => {}
                            None => stack.push((next, false)),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(next: &[&str]) -> StepSpec {
        StepSpec::Action(ActionSpec { connector: "mdm".into(),
                                      operation: "list devices".into(),
                                      params: ParamSpec::Static(vec![serde_json::json!({})]),
                                      formatted: vec![],
                                      next: next.iter().map(|s| s.to_string()).collect() })
    }

    fn join(requires: &[&str], next: &[&str]) -> StepSpec {
        StepSpec::Join(JoinSpec { requires: requires.iter().map(|s| s.to_string()).collect(),
                                  next: next.iter().map(|s| s.to_string()).collect() })
    }

    #[test]
    fn unknown_successor_is_rejected() {
        let err = WorkflowGraph::validated("a", vec![("a".into(), action(&["ghost"]))]).unwrap_err();
        assert_eq!(err,
                   GraphError::UnknownSuccessor { step: "a".into(),
                                                  next: "ghost".into() });
    }

    #[test]
    fn cycles_are_rejected() {
        let err = WorkflowGraph::validated("a",
                                           vec![("a".into(), action(&["b"])),
                                                ("b".into(), action(&["a"]))]).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected(_)));
    }

    #[test]
    fn join_members_must_be_reachable_from_the_entry() {
        let err = WorkflowGraph::validated("a",
                                           vec![("a".into(), action(&["j"])),
                                                ("orphan".into(), action(&["j"])),
                                                ("j".into(), join(&["a", "orphan"], &["end"])),
                                                ("end".into(), StepSpec::Close)]).unwrap_err();
        assert_eq!(err,
                   GraphError::UnreachableJoinInput { join: "j".into(),
                                                      step: "orphan".into() });
    }

    #[test]
    fn duplicate_step_names_are_rejected() {
        let err = WorkflowGraph::validated("a",
                                           vec![("a".into(), action(&[])), ("a".into(), action(&[]))]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateStep("a".into()));
    }

    #[test]
    fn decisions_must_point_at_a_prompt() {
        let err = WorkflowGraph::validated("a",
                                           vec![("a".into(), action(&["d"])),
                                                ("d".into(),
                                                 StepSpec::Decision(DecisionSpec { prompt: "a".into(),
                                                                                   arms: vec![] }))]).unwrap_err();
        assert_eq!(err, GraphError::DecisionWithoutPrompt { step: "d".into() });
    }

    #[test]
    fn a_valid_linear_graph_passes() {
        let graph = WorkflowGraph::validated("a",
                                             vec![("a".into(), action(&["j"])),
                                                  ("j".into(), join(&["a"], &["end"])),
                                                  ("end".into(), StepSpec::Close)]).unwrap();
        assert_eq!(graph.entry(), "a");
        assert_eq!(graph.joins().count(), 1);
    }
}
