//! Engine-level errors. Collaborator failures are not represented here:
//! they are recorded on the invocation record and are terminal for the
//! step, never for the case.

use thiserror::Error;

use crate::graph::GraphError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph: {0}")]
    Graph(#[from] GraphError),
    #[error("unknown step: {0}")]
    UnknownStep(String),
    #[error("unknown connector: {0}")]
    UnknownConnector(String),
    #[error("unknown named list: {0}")]
    UnknownList(String),
    #[error("duplicate write for key: {0}")]
    DuplicateWrite(String),
    #[error("unresolved data path: {0}")]
    UnresolvedPath(String),
    #[error("collect paths must share scope and step")]
    MisalignedPaths,
    #[error("missing formatted artifact: {0}")]
    MissingFormatted(String),
    #[error("prompt record missing for step: {0}")]
    MissingPrompt(String),
    #[error("case already closed")]
    CaseAlreadyClosed,
    #[error("internal: {0}")]
    Internal(String),
}
