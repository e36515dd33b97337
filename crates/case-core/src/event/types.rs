//! Case event kinds and the `CaseEvent` envelope.
//!
//! Role in the workflow:
//! - Every run of the `CaseDriver` emits events to an append-only
//!   `EventStore`, one stream per case id.
//! - The stream is the operator-visible record of what each step did:
//!   an operator inspecting a case sees each step's individual outcome.
//! - The enum `CaseEventKind` is the stable observable contract of the
//!   driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CaseEventKind {
    /// First event of a case run. Fixes the artifact count at intake.
    CaseOpened { artifact_count: usize },
    /// An action step dispatched its fan-out of requests. Does not imply
    /// success.
    ActionStarted {
        step: String,
        connector: String,
        operation: String,
        request_count: usize,
    },
    /// All requests of an action step reached a terminal state.
    ActionFinished {
        step: String,
        success_count: usize,
        failure_count: usize,
    },
    /// One named condition of a filter step was evaluated.
    FilterEvaluated {
        step: String,
        condition: String,
        matched: usize,
    },
    /// A template was rendered and stored under `name`.
    ArtifactFormatted { step: String, name: String },
    /// A human question went out and the branch is suspended.
    PromptRequested { step: String, respondent: String },
    /// The respondent answered within the window.
    PromptAnswered { step: String, response: i64 },
    /// The response window elapsed. Terminal for the branch, not the case.
    PromptTimedOut { step: String },
    /// A step failed outside the normal collaborator-failure path
    /// (e.g. an out-of-range prompt response).
    StepFailed { step: String, reason: String },
    /// A step was pruned because no upstream condition routed to it.
    StepSkipped { step: String },
    /// A join barrier saw all of its required steps terminal and fired.
    JoinSatisfied { step: String },
    /// Terminal event. Emitted exactly once per case.
    CaseClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseEvent {
    pub seq: u64, // assigned by the store (append order)
    pub case_id: Uuid,
    pub kind: CaseEventKind,
    pub ts: DateTime<Utc>, // metadata, not part of any comparison
}
