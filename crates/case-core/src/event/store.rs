use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{CaseEvent, CaseEventKind};

/// Append-only event storage, one stream per case.
pub trait EventStore {
    /// Appends an event from its kind and returns the full event
    /// (with seq and ts).
    fn append_kind(&mut self, case_id: Uuid, kind: CaseEventKind) -> CaseEvent;
    /// Lists the events of a case in ascending seq order.
    fn list(&self, case_id: Uuid) -> Vec<CaseEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: HashMap<Uuid, Vec<CaseEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, case_id: Uuid, kind: CaseEventKind) -> CaseEvent {
        let stream = self.inner.entry(case_id).or_default();
        let ev = CaseEvent { seq: stream.len() as u64,
                             case_id,
                             kind,
                             ts: Utc::now() };
        stream.push(ev.clone());
        ev
    }

    fn list(&self, case_id: Uuid) -> Vec<CaseEvent> {
        self.inner.get(&case_id).cloned().unwrap_or_default()
    }
}
