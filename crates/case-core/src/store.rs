//! The per-run case store.
//!
//! Append-only and keyed: each step writes exactly one slot under its own
//! name, so no write-write conflict is possible by construction. The store
//! enforces that with a write-once check instead of trusting the graph.
//! Prompt records are the one exception: they are written once while
//! pending and then transition state in place (`Pending` -> `Answered` or
//! `TimedOut`), never rewritten.

use std::collections::HashMap;

use crate::errors::EngineError;
use crate::model::{ActionRecord, FilteredSet, PromptRecord, PromptStatus};

#[derive(Debug, Default)]
pub struct CaseStore {
    actions: HashMap<String, ActionRecord>,
    filtered: HashMap<(String, String), FilteredSet>,
    formatted: HashMap<String, String>,
    prompts: HashMap<String, PromptRecord>,
}

impl CaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_action(&mut self, record: ActionRecord) -> Result<(), EngineError> {
        if self.actions.contains_key(&record.step) {
            return Err(EngineError::DuplicateWrite(record.step));
        }
        self.actions.insert(record.step.clone(), record);
        Ok(())
    }

    pub fn action(&self, step: &str) -> Option<&ActionRecord> {
        self.actions.get(step)
    }

    pub fn put_filtered(&mut self, filter: &str, condition: &str, set: FilteredSet) -> Result<(), EngineError> {
        let key = (filter.to_string(), condition.to_string());
        if self.filtered.contains_key(&key) {
            return Err(EngineError::DuplicateWrite(format!("{filter}:{condition}")));
        }
        self.filtered.insert(key, set);
        Ok(())
    }

    pub fn filtered(&self, filter: &str, condition: &str) -> Option<&FilteredSet> {
        self.filtered.get(&(filter.to_string(), condition.to_string()))
    }

    pub fn put_formatted(&mut self, name: &str, rendered: String) -> Result<(), EngineError> {
        if self.formatted.contains_key(name) {
            return Err(EngineError::DuplicateWrite(name.to_string()));
        }
        self.formatted.insert(name.to_string(), rendered);
        Ok(())
    }

    /// Retrieves a formatted artifact by name, byte-identical to what the
    /// formatter stored.
    pub fn formatted(&self, name: &str) -> Option<&str> {
        self.formatted.get(name).map(|s| s.as_str())
    }

    pub fn put_prompt(&mut self, record: PromptRecord) -> Result<(), EngineError> {
        if self.prompts.contains_key(&record.step) {
            return Err(EngineError::DuplicateWrite(record.step));
        }
        self.prompts.insert(record.step.clone(), record);
        Ok(())
    }

    pub fn prompt(&self, step: &str) -> Option<&PromptRecord> {
        self.prompts.get(step)
    }

    pub fn answer_prompt(&mut self, step: &str, answer: i64) -> Result<(), EngineError> {
        let record = self.prompts
                         .get_mut(step)
                         .ok_or_else(|| EngineError::MissingPrompt(step.to_string()))?;
        record.status = PromptStatus::Answered;
        record.answer = Some(answer);
        Ok(())
    }

    pub fn time_out_prompt(&mut self, step: &str) -> Result<(), EngineError> {
        let record = self.prompts
                         .get_mut(step)
                         .ok_or_else(|| EngineError::MissingPrompt(step.to_string()))?;
        record.status = PromptStatus::TimedOut;
        Ok(())
    }
}
