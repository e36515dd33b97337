//! Prompt records: one outstanding human question per prompt step.

use serde::{Deserialize, Serialize};

/// Prompt lifecycle. `Pending` -> `Answered` or `Pending` -> `TimedOut`;
/// no other transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptStatus {
    Pending,
    Answered,
    TimedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRecord {
    pub step: String,
    pub respondent: String,
    pub message: String,
    /// Inclusive bounds the response must fall into.
    pub min: i64,
    pub max: i64,
    pub status: PromptStatus,
    pub answer: Option<i64>,
}

impl PromptRecord {
    pub fn pending(step: &str, respondent: &str, message: &str, min: i64, max: i64) -> Self {
        Self { step: step.to_string(),
               respondent: respondent.to_string(),
               message: message.to_string(),
               min,
               max,
               status: PromptStatus::Pending,
               answer: None }
    }
}
