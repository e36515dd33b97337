//! Scripted respondent.
//!
//! Stands in for the human side of a prompt gate: answers with a fixed
//! value after an optional delay, or stays silent so the gate's response
//! window elapses.

use std::time::Duration;

use async_trait::async_trait;
use case_core::{HumanChannel, PromptError, PromptRequest};

enum Script {
    Respond { value: i64, delay: Duration },
    Silent,
}

pub struct ScriptedHumanChannel {
    script: Script,
}

impl ScriptedHumanChannel {
    pub fn answers(value: i64) -> Self {
        Self::answers_after(value, Duration::ZERO)
    }

    pub fn answers_after(value: i64, delay: Duration) -> Self {
        Self { script: Script::Respond { value, delay } }
    }

    /// Never responds; the caller's timeout decides.
    pub fn silent() -> Self {
        Self { script: Script::Silent }
    }
}

#[async_trait]
impl HumanChannel for ScriptedHumanChannel {
    async fn ask(&self, request: &PromptRequest) -> Result<i64, PromptError> {
        match &self.script {
            Script::Respond { value, delay } => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                log::info!("{} responded {} to prompt", request.respondent, value);
                Ok(*value)
            }
            Script::Silent => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PromptRequest {
        PromptRequest { respondent: "admin".to_string(),
                        message: "?".to_string(),
                        min: 1,
                        max: 100 }
    }

    #[tokio::test]
    async fn a_scripted_answer_resolves() {
        let channel = ScriptedHumanChannel::answers(2);
        assert_eq!(channel.ask(&request()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn a_silent_channel_outlives_any_window() {
        let channel = ScriptedHumanChannel::silent();
        let outcome = tokio::time::timeout(Duration::from_millis(20), channel.ask(&request())).await;
        assert!(outcome.is_err());
    }
}
