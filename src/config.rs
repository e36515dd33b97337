//! Runtime configuration from environment variables, `.env` supported.

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Load the .env file exactly once.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // missing .env is fine
});

#[derive(Debug, Clone)]
pub struct CaseflowConfig {
    /// Response window of the approval prompt.
    pub prompt_timeout: Duration,
    /// User the approval prompt is addressed to.
    pub respondent: String,
    /// Device external id of the demo case artifact.
    pub device_id: String,
    /// Answer the scripted respondent gives in the demo run.
    pub prompt_response: i64,
}

impl CaseflowConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let prompt_timeout_secs = env::var("CASEFLOW_PROMPT_TIMEOUT_SECS").ok()
                                                                          .and_then(|v| v.parse().ok())
                                                                          .unwrap_or(1800);
        let respondent = env::var("CASEFLOW_RESPONDENT").unwrap_or_else(|_| "admin".to_string());
        let device_id = env::var("CASEFLOW_DEVICE_ID").unwrap_or_else(|_| "U1".to_string());
        let prompt_response = env::var("CASEFLOW_PROMPT_RESPONSE").ok()
                                                                  .and_then(|v| v.parse().ok())
                                                                  .unwrap_or(1);
        Self { prompt_timeout: Duration::from_secs(prompt_timeout_secs),
               respondent,
               device_id,
               prompt_response }
    }
}
