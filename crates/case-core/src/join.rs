//! The join barrier.
//!
//! Blocks progression until a named set of upstream steps has each
//! reached a terminal state: success, failure, skip and timeout all
//! count. Re-evaluated every time a required step turns terminal; fires
//! exactly once, and every evaluation after that is a no-op, so a barrier
//! can never deadlock a case on a failed or pruned input.

use std::collections::{BTreeSet, HashMap};

use crate::status::StepStatus;

#[derive(Debug)]
pub struct JoinBarrier {
    required: BTreeSet<String>,
    fired: bool,
}

impl JoinBarrier {
    pub fn new<I, S>(required: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self { required: required.into_iter().map(Into::into).collect(),
               fired: false }
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns true exactly once: the first observation where every
    /// required step is terminal.
    pub fn observe(&mut self, statuses: &HashMap<String, StepStatus>) -> bool {
        if self.fired {
            return false;
        }
        let satisfied = self.required
                            .iter()
                            .all(|step| statuses.get(step).is_some_and(|s| s.is_terminal()));
        if satisfied {
            self.fired = true;
        }
        satisfied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(entries: &[(&str, StepStatus)]) -> HashMap<String, StepStatus> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn fires_once_when_all_required_steps_are_terminal() {
        let mut barrier = JoinBarrier::new(["t1", "t2", "t3"]);
        assert!(!barrier.observe(&statuses(&[("t1", StepStatus::Succeeded),
                                             ("t2", StepStatus::Running),
                                             ("t3", StepStatus::Pending)])));

        let done = statuses(&[("t1", StepStatus::Succeeded),
                              ("t2", StepStatus::Failed),
                              ("t3", StepStatus::Skipped)]);
        assert!(barrier.observe(&done));
        // redundant evaluations after firing are no-ops
        assert!(!barrier.observe(&done));
        assert!(barrier.has_fired());
    }

    #[test]
    fn failure_and_timeout_count_as_terminal() {
        let mut barrier = JoinBarrier::new(["t1", "t2"]);
        assert!(barrier.observe(&statuses(&[("t1", StepStatus::TimedOut), ("t2", StepStatus::Failed)])));
    }

    #[test]
    fn missing_status_blocks_the_barrier() {
        let mut barrier = JoinBarrier::new(["t1", "t2"]);
        assert!(!barrier.observe(&statuses(&[("t1", StepStatus::Succeeded)])));
    }
}
