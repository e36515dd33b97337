//! The collaborator seam.
//!
//! Every external system (device management, directory, ticketing) is an
//! opaque asynchronous service behind this single request/response
//! contract. The engine never interprets the payloads; it only records
//! them.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Rows and optional status message returned by one successful request.
#[derive(Debug, Clone, Default)]
pub struct CallOutput {
    pub data: Vec<Value>,
    pub message: Option<String>,
}

impl CallOutput {
    pub fn rows(data: Vec<Value>) -> Self {
        Self { data, message: None }
    }
}

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("{0}")]
    Failed(String),
}

/// One external collaborator. Implementations must be safe to share
/// across the driver's in-flight futures.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    /// Issues a single request. An `Err` is a terminal failure for the
    /// request, recorded on the invocation record; it never aborts the
    /// workflow.
    async fn call(&self, operation: &str, params: &Value) -> Result<CallOutput, ConnectorError>;
}
