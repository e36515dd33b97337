//! In-memory mobile device management service.
//!
//! Serves a fixed device inventory and records lock requests. Individual
//! devices can be marked unreachable to exercise the partial-failure path
//! of a lock fan-out.

use std::sync::Mutex;

use async_trait::async_trait;
use case_core::{CallOutput, Connector, ConnectorError};
use serde_json::{json, Value};

pub struct MdmConnector {
    devices: Vec<Value>,
    unreachable: Vec<String>,
    locked: Mutex<Vec<String>>,
}

impl MdmConnector {
    /// `devices` are the inventory rows returned by `list devices`,
    /// typically objects with `uuid` and `userId` fields.
    pub fn new(devices: Vec<Value>) -> Self {
        Self { devices,
               unreachable: Vec::new(),
               locked: Mutex::new(Vec::new()) }
    }

    /// Marks a device so that lock requests against it fail.
    pub fn with_unreachable(mut self, uuid: &str) -> Self {
        self.unreachable.push(uuid.to_string());
        self
    }

    /// Uuids locked so far, in request order.
    pub fn locked(&self) -> Vec<String> {
        self.locked.lock().expect("mdm lock state poisoned").clone()
    }
}

#[async_trait]
impl Connector for MdmConnector {
    fn name(&self) -> &str {
        "mdm"
    }

    async fn call(&self, operation: &str, params: &Value) -> Result<CallOutput, ConnectorError> {
        match operation {
            "list devices" => Ok(CallOutput::rows(self.devices.clone())),
            "lock device" => {
                let uuid = params.get("uuid")
                                 .and_then(Value::as_str)
                                 .unwrap_or_default()
                                 .to_string();
                if self.unreachable.contains(&uuid) {
                    return Err(ConnectorError::Failed(format!("device {uuid} unreachable")));
                }
                self.locked.lock().expect("mdm lock state poisoned").push(uuid.clone());
                log::info!("locked device {uuid}");
                Ok(CallOutput { data: vec![json!({ "uuid": uuid, "status": "locked" })],
                                message: Some("device locked".to_string()) })
            }
            other => Err(ConnectorError::UnsupportedOperation(other.to_string())),
        }
    }
}
