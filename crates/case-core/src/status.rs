/// Run-time state of one step within a case run.
///
/// Valid transitions:
/// - `Pending` -> `Running` (dispatched)
/// - `Pending` -> `Skipped` (no upstream condition routed here)
/// - `Running` -> `Succeeded` | `Failed` | `TimedOut`
///
/// Everything except `Pending` and `Running` is terminal; join barriers
/// treat all terminal states alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Pruned: the branch that would have reached this step was never
    /// taken.
    Skipped,
    /// A prompt step whose response window elapsed.
    TimedOut,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending | StepStatus::Running)
    }
}
