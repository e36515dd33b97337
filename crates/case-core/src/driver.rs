//! The workflow graph driver.
//!
//! Owns the step registry and dispatches each step's continuation once
//! its asynchronous dependency resolves. Synchronous steps (filter,
//! format, decision, join, close) execute inline against the case store;
//! the two suspension points (action fan-outs and human prompts) run as
//! an in-flight future set, so a branch suspended on a human never blocks
//! a branch that is talking to a collaborator.
//!
//! Case state machine: `Open` while steps are outstanding, `Closing` once
//! the terminal join barrier fires, `Closed` after the close step runs,
//! exactly once. Branches that no condition or decision routed to are
//! pruned transitively (`Skipped` is terminal), which is what keeps join
//! barriers from hanging on a path that was never taken.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::collect::{collect, is_truthy, resolve_first};
use crate::condition::{evaluate, NamedListStore};
use crate::connector::Connector;
use crate::errors::EngineError;
use crate::event::{CaseEvent, CaseEventKind, EventStore, InMemoryEventStore};
use crate::graph::{ActionSpec, ParamSpec, PromptSpec, StepSpec, WorkflowGraph};
use crate::human::{HumanChannel, PromptRequest};
use crate::invoker::invoke;
use crate::join::JoinBarrier;
use crate::model::{ActionRecord, ActionRequest, ActionResult, Case, CaseStatus, PromptRecord};
use crate::path::Field;
use crate::status::StepStatus;
use crate::store::CaseStore;
use crate::template;

/// What an in-flight future resolves with.
enum AsyncOutcome {
    Action(Vec<ActionResult>),
    Prompt(PromptOutcome),
}

enum PromptOutcome {
    Answered(i64),
    OutOfRange(i64),
    TimedOut,
    ChannelFailed(String),
}

type InFlight = FuturesUnordered<BoxFuture<'static, (String, AsyncOutcome)>>;

/// Mutable state of one case run. The store is append-only; statuses and
/// barriers drive scheduling.
struct RunState {
    store: CaseStore,
    statuses: HashMap<String, StepStatus>,
    barriers: HashMap<String, JoinBarrier>,
    ready: VecDeque<String>,
}

pub struct CaseDriver<E: EventStore> {
    graph: WorkflowGraph,
    connectors: HashMap<String, Arc<dyn Connector>>,
    human: Arc<dyn HumanChannel>,
    lists: Arc<dyn NamedListStore>,
    event_store: E,
}

impl CaseDriver<InMemoryEventStore> {
    /// Driver with an in-memory event store.
    pub fn in_memory(graph: WorkflowGraph, human: Arc<dyn HumanChannel>, lists: Arc<dyn NamedListStore>) -> Self {
        Self::new(graph, InMemoryEventStore::default(), human, lists)
    }
}

impl<E: EventStore> CaseDriver<E> {
    pub fn new(graph: WorkflowGraph, event_store: E, human: Arc<dyn HumanChannel>, lists: Arc<dyn NamedListStore>) -> Self {
        Self { graph,
               connectors: HashMap::new(),
               human,
               lists,
               event_store }
    }

    /// Registers a collaborator under its own name.
    pub fn register_connector(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.name().to_string(), connector);
    }

    pub fn events_for(&self, case_id: Uuid) -> Vec<CaseEvent> {
        self.event_store.list(case_id)
    }

    /// Compact single-letter view of a case's event stream, for logs and
    /// assertions.
    pub fn event_variants(&self, case_id: Uuid) -> Vec<&'static str> {
        self.event_store
            .list(case_id)
            .iter()
            .map(|e| match e.kind {
                CaseEventKind::CaseOpened { .. } => "O",
                CaseEventKind::ActionStarted { .. } => "S",
                CaseEventKind::ActionFinished { .. } => "F",
                CaseEventKind::FilterEvaluated { .. } => "E",
                CaseEventKind::ArtifactFormatted { .. } => "T",
                CaseEventKind::PromptRequested { .. } => "P",
                CaseEventKind::PromptAnswered { .. } => "R",
                CaseEventKind::PromptTimedOut { .. } => "W",
                CaseEventKind::StepFailed { .. } => "X",
                CaseEventKind::StepSkipped { .. } => "K",
                CaseEventKind::JoinSatisfied { .. } => "J",
                CaseEventKind::CaseClosed => "C",
            })
            .collect()
    }

    /// Runs the graph to quiescence for one case and returns the run's
    /// store for inspection.
    pub async fn run(&mut self, case: &mut Case) -> Result<CaseStore, EngineError> {
        if case.is_closed() {
            return Err(EngineError::CaseAlreadyClosed);
        }

        let mut rs = RunState { store: CaseStore::new(),
                                statuses: self.graph
                                              .step_names()
                                              .map(|n| (n.to_string(), StepStatus::Pending))
                                              .collect(),
                                barriers: self.graph
                                              .joins()
                                              .map(|(n, j)| (n.to_string(), JoinBarrier::new(j.requires.clone())))
                                              .collect(),
                                ready: VecDeque::new() };
        let mut in_flight: InFlight = FuturesUnordered::new();

        self.event_store
            .append_kind(case.id, CaseEventKind::CaseOpened { artifact_count: case.artifacts.len() });
        rs.ready.push_back(self.graph.entry().to_string());

        loop {
            while let Some(step) = rs.ready.pop_front() {
                self.dispatch(case, &mut rs, &mut in_flight, &step)?;
            }
            match in_flight.next().await {
                Some((step, outcome)) => self.complete(case, &mut rs, &step, outcome)?,
                None => break,
            }
        }

        if !case.is_closed() {
            log::warn!("case {} ran to quiescence without closing", case.id);
        }
        Ok(rs.store)
    }

    fn dispatch(&mut self,
                case: &mut Case,
                rs: &mut RunState,
                in_flight: &mut InFlight,
                step: &str)
                -> Result<(), EngineError> {
        let spec = self.graph
                       .step(step)
                       .ok_or_else(|| EngineError::UnknownStep(step.to_string()))?
                       .clone();

        // Joins are observations, not executions.
        if matches!(spec, StepSpec::Join(_)) {
            return self.observe_join(case, rs, step);
        }
        if rs.statuses.get(step) != Some(&StepStatus::Pending) {
            return Ok(());
        }
        rs.statuses.insert(step.to_string(), StepStatus::Running);
        log::debug!("case {}: dispatching step {}", case.id, step);

        match spec {
            StepSpec::Action(action) => self.dispatch_action(case, rs, in_flight, step, &action),
            StepSpec::Filter(filter) => {
                for cond in &filter.conditions {
                    let set = evaluate(case, &rs.store, self.lists.as_ref(), &cond.predicates)?;
                    self.event_store.append_kind(case.id,
                                                 CaseEventKind::FilterEvaluated { step: step.to_string(),
                                                                                  condition: cond.name.clone(),
                                                                                  matched: set.len() });
                    let matched = !set.is_empty();
                    rs.store.put_filtered(step, &cond.name, set)?;
                    for next in &cond.next {
                        if matched {
                            self.schedule(case, rs, next)?;
                        } else {
                            self.skip_subtree(case, rs, next)?;
                        }
                    }
                }
                rs.statuses.insert(step.to_string(), StepStatus::Succeeded);
                Ok(())
            }
            StepSpec::Format(format) => {
                template::format(&mut rs.store, &format.template, &format.paths, step)?;
                self.event_store.append_kind(case.id,
                                             CaseEventKind::ArtifactFormatted { step: step.to_string(),
                                                                                name: step.to_string() });
                rs.statuses.insert(step.to_string(), StepStatus::Succeeded);
                for next in &format.next {
                    self.schedule(case, rs, next)?;
                }
                Ok(())
            }
            StepSpec::Prompt(prompt) => self.dispatch_prompt(case, rs, in_flight, step, &prompt),
            StepSpec::Decision(decision) => {
                let answer = rs.store
                               .prompt(&decision.prompt)
                               .ok_or_else(|| EngineError::MissingPrompt(decision.prompt.clone()))?
                               .answer;
                let mut taken = false;
                for arm in &decision.arms {
                    if !taken && answer == Some(arm.response) {
                        taken = true;
                        for next in &arm.next {
                            self.schedule(case, rs, next)?;
                        }
                    } else {
                        for next in &arm.next {
                            self.skip_subtree(case, rs, next)?;
                        }
                    }
                }
                if !taken {
                    log::debug!("case {}: decision {} matched no arm (response {:?})", case.id, step, answer);
                }
                rs.statuses.insert(step.to_string(), StepStatus::Succeeded);
                Ok(())
            }
            StepSpec::Join(_) => unreachable!("joins are handled above"),
            StepSpec::Close => {
                if case.status == CaseStatus::Closed {
                    return Err(EngineError::CaseAlreadyClosed);
                }
                case.status = CaseStatus::Closed;
                self.event_store.append_kind(case.id, CaseEventKind::CaseClosed);
                rs.statuses.insert(step.to_string(), StepStatus::Succeeded);
                Ok(())
            }
        }
    }

    fn dispatch_action(&mut self,
                       case: &mut Case,
                       rs: &mut RunState,
                       in_flight: &mut InFlight,
                       step: &str,
                       spec: &ActionSpec)
                       -> Result<(), EngineError> {
        let connector = self.connectors
                            .get(&spec.connector)
                            .ok_or_else(|| EngineError::UnknownConnector(spec.connector.clone()))?;
        let connector = Arc::clone(connector);
        let requests = build_requests(&rs.store, spec)?;
        self.event_store.append_kind(case.id,
                                     CaseEventKind::ActionStarted { step: step.to_string(),
                                                                    connector: spec.connector.clone(),
                                                                    operation: spec.operation.clone(),
                                                                    request_count: requests.len() });
        let operation = spec.operation.clone();
        let name = step.to_string();
        in_flight.push(Box::pin(async move {
                           let results = invoke(connector, &operation, requests).await;
                           (name, AsyncOutcome::Action(results))
                       }));
        Ok(())
    }

    fn dispatch_prompt(&mut self,
                       case: &mut Case,
                       rs: &mut RunState,
                       in_flight: &mut InFlight,
                       step: &str,
                       spec: &PromptSpec)
                       -> Result<(), EngineError> {
        let mut values = Vec::with_capacity(spec.paths.len());
        for path in &spec.paths {
            values.push(resolve_first(&rs.store, path)?);
        }
        let message = template::render(&spec.message, &values);
        rs.store
          .put_prompt(PromptRecord::pending(step, &spec.respondent, &message, spec.min, spec.max))?;
        self.event_store.append_kind(case.id,
                                     CaseEventKind::PromptRequested { step: step.to_string(),
                                                                      respondent: spec.respondent.clone() });

        let request = PromptRequest { respondent: spec.respondent.clone(),
                                      message,
                                      min: spec.min,
                                      max: spec.max };
        let human = Arc::clone(&self.human);
        let window = spec.timeout;
        let (min, max) = (spec.min, spec.max);
        let name = step.to_string();
        in_flight.push(Box::pin(async move {
                           let outcome = match tokio::time::timeout(window, human.ask(&request)).await {
                               Ok(Ok(n)) if (min..=max).contains(&n) => PromptOutcome::Answered(n),
                               Ok(Ok(n)) => PromptOutcome::OutOfRange(n),
                               Ok(Err(err)) => PromptOutcome::ChannelFailed(err.to_string()),
                               Err(_) => PromptOutcome::TimedOut,
                           };
                           (name, AsyncOutcome::Prompt(outcome))
                       }));
        Ok(())
    }

    /// Records a resolved async step and schedules its continuation.
    fn complete(&mut self,
                case: &mut Case,
                rs: &mut RunState,
                step: &str,
                outcome: AsyncOutcome)
                -> Result<(), EngineError> {
        let spec = self.graph
                       .step(step)
                       .ok_or_else(|| EngineError::UnknownStep(step.to_string()))?
                       .clone();
        match (spec, outcome) {
            (StepSpec::Action(action), AsyncOutcome::Action(results)) => {
                let record = ActionRecord::new(step, &action.connector, &action.operation, results);
                self.event_store.append_kind(case.id,
                                             CaseEventKind::ActionFinished { step: step.to_string(),
                                                                             success_count: record.success_count(),
                                                                             failure_count: record.failure_count() });
                let succeeded = record.success;
                rs.store.put_action(record)?;
                rs.statuses.insert(step.to_string(),
                                   if succeeded { StepStatus::Succeeded } else { StepStatus::Failed });
                // Failure is terminal for the requests, not for the path:
                // the continuation still sees the full result set.
                for next in &action.next {
                    self.schedule(case, rs, next)?;
                }
                Ok(())
            }
            (StepSpec::Prompt(prompt), AsyncOutcome::Prompt(resolution)) => match resolution {
                PromptOutcome::Answered(n) => {
                    rs.store.answer_prompt(step, n)?;
                    self.event_store.append_kind(case.id,
                                                 CaseEventKind::PromptAnswered { step: step.to_string(),
                                                                                 response: n });
                    rs.statuses.insert(step.to_string(), StepStatus::Succeeded);
                    for next in &prompt.next {
                        self.schedule(case, rs, next)?;
                    }
                    Ok(())
                }
                PromptOutcome::TimedOut => {
                    rs.store.time_out_prompt(step)?;
                    self.event_store
                        .append_kind(case.id, CaseEventKind::PromptTimedOut { step: step.to_string() });
                    rs.statuses.insert(step.to_string(), StepStatus::TimedOut);
                    for next in &prompt.next {
                        self.skip_subtree(case, rs, next)?;
                    }
                    Ok(())
                }
                PromptOutcome::OutOfRange(n) => {
                    // The respondent did answer; the record keeps what they
                    // said, but the gate rejects it and no decision fires.
                    rs.store.answer_prompt(step, n)?;
                    self.event_store.append_kind(case.id,
                                                 CaseEventKind::StepFailed {
                                                     step: step.to_string(),
                                                     reason: format!("response {n} outside range {}..={}",
                                                                     prompt.min, prompt.max),
                                                 });
                    rs.statuses.insert(step.to_string(), StepStatus::Failed);
                    for next in &prompt.next {
                        self.skip_subtree(case, rs, next)?;
                    }
                    Ok(())
                }
                PromptOutcome::ChannelFailed(reason) => {
                    self.event_store.append_kind(case.id,
                                                 CaseEventKind::StepFailed { step: step.to_string(),
                                                                             reason });
                    rs.statuses.insert(step.to_string(), StepStatus::Failed);
                    for next in &prompt.next {
                        self.skip_subtree(case, rs, next)?;
                    }
                    Ok(())
                }
            },
            _ => Err(EngineError::Internal(format!("mismatched async outcome for step {step}"))),
        }
    }

    /// Schedules a successor: joins are observed, everything else queues
    /// once while pending.
    fn schedule(&mut self, case: &mut Case, rs: &mut RunState, step: &str) -> Result<(), EngineError> {
        if matches!(self.graph.step(step), Some(StepSpec::Join(_))) {
            return self.observe_join(case, rs, step);
        }
        if rs.statuses.get(step) == Some(&StepStatus::Pending) && !rs.ready.iter().any(|s| s == step) {
            rs.ready.push_back(step.to_string());
        }
        Ok(())
    }

    /// Prunes a branch that was not taken. `Skipped` is terminal, so
    /// every barrier waiting on a pruned member is re-evaluated along the
    /// way; that is what keeps untaken prompt/decision paths from
    /// leaving the case open forever.
    fn skip_subtree(&mut self, case: &mut Case, rs: &mut RunState, step: &str) -> Result<(), EngineError> {
        if matches!(self.graph.step(step), Some(StepSpec::Join(_))) {
            return self.observe_join(case, rs, step);
        }
        if rs.statuses.get(step) != Some(&StepStatus::Pending) {
            return Ok(());
        }
        rs.statuses.insert(step.to_string(), StepStatus::Skipped);
        self.event_store
            .append_kind(case.id, CaseEventKind::StepSkipped { step: step.to_string() });
        let successors: Vec<String> = self.graph
                                          .step(step)
                                          .map(|s| s.successors().iter().map(|n| n.to_string()).collect())
                                          .unwrap_or_default();
        for next in successors {
            self.skip_subtree(case, rs, &next)?;
        }
        Ok(())
    }

    /// Re-evaluates a join barrier; fires its continuation exactly once.
    fn observe_join(&mut self, case: &mut Case, rs: &mut RunState, step: &str) -> Result<(), EngineError> {
        let barrier = rs.barriers
                        .get_mut(step)
                        .ok_or_else(|| EngineError::UnknownStep(step.to_string()))?;
        if !barrier.observe(&rs.statuses) {
            return Ok(());
        }
        rs.statuses.insert(step.to_string(), StepStatus::Succeeded);
        self.event_store
            .append_kind(case.id, CaseEventKind::JoinSatisfied { step: step.to_string() });
        if case.status == CaseStatus::Open {
            case.status = CaseStatus::Closing;
        }
        let next: Vec<String> = match self.graph.step(step) {
            Some(StepSpec::Join(join)) => join.next.clone(),
            _ => Vec::new(),
        };
        for n in &next {
            self.schedule(case, rs, n)?;
        }
        Ok(())
    }
}

/// Builds the fan-out parameter sets for an action step.
fn build_requests(store: &CaseStore, spec: &ActionSpec) -> Result<Vec<ActionRequest>, EngineError> {
    let mut merged: Map<String, Value> = Map::new();
    for (field, artifact_name) in &spec.formatted {
        let text = store.formatted(artifact_name)
                        .ok_or_else(|| EngineError::MissingFormatted(artifact_name.clone()))?;
        merged.insert(field.clone(), Value::String(text.to_string()));
    }

    match &spec.params {
        ParamSpec::Static(sets) => Ok(sets.iter()
                                          .map(|params| {
                                              let mut obj = match params {
                                                  Value::Object(map) => map.clone(),
                                                  other => {
                                                      let mut map = Map::new();
                                                      if !other.is_null() {
                                                          map.insert("value".to_string(), other.clone());
                                                      }
                                                      map
                                                  }
                                              };
                                              obj.extend(merged.clone());
                                              ActionRequest { params: Value::Object(obj),
                                                              context_artifact: None }
                                          })
                                          .collect()),
        ParamSpec::Collected(cs) => {
            let rows = collect(store, &cs.paths)?;
            let context_idx = cs.paths.iter().position(|p| p.field == Field::ContextArtifact);
            let mut requests = Vec::new();
            for row in rows {
                // a tuple is only acted upon if its primary value is truthy
                if !row.first().is_some_and(is_truthy) {
                    continue;
                }
                let mut obj = Map::new();
                for (field, value) in &cs.consts {
                    obj.insert(field.clone(), value.clone());
                }
                for (field, idx) in &cs.bind {
                    obj.insert(field.clone(), row.get(*idx).cloned().unwrap_or(Value::Null));
                }
                obj.extend(merged.clone());
                let context = context_idx.and_then(|i| row.get(i)).and_then(Value::as_u64);
                requests.push(ActionRequest { params: Value::Object(obj),
                                              context_artifact: context });
            }
            Ok(requests)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{CallOutput, ConnectorError};
    use crate::graph::JoinSpec;
    use crate::human::PromptError;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Connector for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        async fn call(&self, _operation: &str, params: &Value) -> Result<CallOutput, ConnectorError> {
            Ok(CallOutput::rows(vec![params.clone()]))
        }
    }

    struct NoHuman;

    #[async_trait]
    impl HumanChannel for NoHuman {
        async fn ask(&self, _request: &PromptRequest) -> Result<i64, PromptError> {
            Err(PromptError::Channel("nobody home".into()))
        }
    }

    struct NoLists;

    impl NamedListStore for NoLists {
        fn contains(&self, _list: &str, _value: &str) -> Option<bool> {
            None
        }
    }

    #[tokio::test]
    async fn linear_action_join_close_closes_the_case_once() {
        let graph = WorkflowGraph::validated(
            "ping",
            vec![("ping".into(),
                  StepSpec::Action(ActionSpec { connector: "echo".into(),
                                                operation: "ping".into(),
                                                params: ParamSpec::Static(vec![json!({"n": 1})]),
                                                formatted: vec![],
                                                next: vec!["barrier".into()] })),
                 ("barrier".into(),
                  StepSpec::Join(JoinSpec { requires: vec!["ping".into()],
                                            next: vec!["done".into()] })),
                 ("done".into(), StepSpec::Close)],
        ).unwrap();

        let mut driver = CaseDriver::in_memory(graph, Arc::new(NoHuman), Arc::new(NoLists));
        driver.register_connector(Arc::new(Echo));

        let mut case = Case::new(vec![]);
        let store = driver.run(&mut case).await.unwrap();

        assert!(case.is_closed());
        assert!(store.action("ping").unwrap().success);
        assert_eq!(driver.event_variants(case.id), vec!["O", "S", "F", "J", "C"]);

        // a closed case cannot run again
        assert!(matches!(driver.run(&mut case).await, Err(EngineError::CaseAlreadyClosed)));
    }
}
