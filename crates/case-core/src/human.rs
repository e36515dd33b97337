//! The human notification/response channel.
//!
//! One prompt request per invocation. The channel itself is unbounded;
//! the driver wraps every ask in the prompt step's timeout and maps the
//! elapsed window to an explicit timed-out outcome.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub respondent: String,
    pub message: String,
    /// Inclusive response range the gate will accept.
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt channel unavailable: {0}")]
    Channel(String),
}

#[async_trait]
pub trait HumanChannel: Send + Sync {
    async fn ask(&self, request: &PromptRequest) -> Result<i64, PromptError>;
}
