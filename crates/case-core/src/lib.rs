//! Incident-response workflow engine.
//!
//! Executes a validated, data-driven graph of steps against one case:
//! asynchronous fan-outs to external collaborators, record-level filter
//! conditions, templated report artifacts, a human prompt gate with a
//! response window, and a join barrier that closes the case exactly once.
//!
//! Design tenets:
//! - The topology is data (`WorkflowGraph`), validated when built.
//! - Everything a run produces is append-only: the per-run `CaseStore`
//!   is write-once per key and the `EventStore` only grows.
//! - Collaborator and human failures are terminal for a step, never for
//!   the case; pruned branches turn `Skipped` so joins cannot deadlock.

pub mod collect;
pub mod condition;
pub mod connector;
pub mod driver;
pub mod errors;
pub mod event;
pub mod graph;
pub mod human;
pub mod invoker;
pub mod join;
pub mod model;
pub mod path;
pub mod status;
pub mod store;
pub mod template;

pub use collect::{collect, is_truthy, resolve_first};
pub use condition::{CmpOp, NamedListStore, Operand, Predicate};
pub use connector::{CallOutput, Connector, ConnectorError};
pub use driver::CaseDriver;
pub use errors::EngineError;
pub use event::{CaseEvent, CaseEventKind, EventStore, InMemoryEventStore};
pub use graph::{ActionSpec, CollectSpec, ConditionSpec, DecisionArm, DecisionSpec, FilterSpec, FormatSpec,
                GraphError, JoinSpec, ParamSpec, PromptSpec, StepSpec, WorkflowGraph};
pub use human::{HumanChannel, PromptError, PromptRequest};
pub use join::JoinBarrier;
pub use model::{ActionRecord, ActionRequest, ActionResult, Case, CaseArtifact, CaseStatus, FilteredRecord,
                FilteredSet, PromptRecord, PromptStatus};
pub use path::{DataPath, Field, Scope};
pub use status::StepStatus;
pub use store::CaseStore;
