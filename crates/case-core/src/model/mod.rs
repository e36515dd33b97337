mod action;
mod case;
mod filtered;
mod prompt;

pub use action::{ActionRecord, ActionRequest, ActionResult};
pub use case::{Case, CaseArtifact, CaseStatus};
pub use filtered::{FilteredRecord, FilteredSet};
pub use prompt::{PromptRecord, PromptStatus};
