//! In-memory user directory.
//!
//! Answers attribute lookups from a fixed table and records password
//! resets.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use case_core::{CallOutput, Connector, ConnectorError};
use serde_json::{json, Value};

pub struct DirectoryConnector {
    attributes: HashMap<String, Value>,
    resets: Mutex<Vec<String>>,
}

impl DirectoryConnector {
    pub fn new() -> Self {
        Self { attributes: HashMap::new(),
               resets: Mutex::new(Vec::new()) }
    }

    /// Adds a user's attribute row as returned by `get user attributes`.
    pub fn with_user(mut self, username: &str, attributes: Value) -> Self {
        self.attributes.insert(username.to_string(), attributes);
        self
    }

    /// Usernames whose passwords were reset, in request order.
    pub fn resets(&self) -> Vec<String> {
        self.resets.lock().expect("directory reset state poisoned").clone()
    }
}

impl Default for DirectoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for DirectoryConnector {
    fn name(&self) -> &str {
        "directory"
    }

    async fn call(&self, operation: &str, params: &Value) -> Result<CallOutput, ConnectorError> {
        let username = params.get("username")
                             .and_then(Value::as_str)
                             .unwrap_or_default()
                             .to_string();
        match operation {
            "get user attributes" => {
                let row = self.attributes
                              .get(&username)
                              .cloned()
                              .unwrap_or_else(|| json!({ "username": username }));
                Ok(CallOutput::rows(vec![row]))
            }
            "reset password" => {
                if username.is_empty() {
                    return Err(ConnectorError::Failed("reset password requires a username".to_string()));
                }
                self.resets.lock().expect("directory reset state poisoned").push(username.clone());
                log::info!("reset password for {username}");
                Ok(CallOutput { data: vec![json!({ "username": username })],
                                message: Some("password reset".to_string()) })
            }
            other => Err(ConnectorError::UnsupportedOperation(other.to_string())),
        }
    }
}
