//! The action invoker.
//!
//! Issues one asynchronous request per parameter set, all against the
//! same operation on one collaborator, and resolves with the full result
//! set once every request is terminal. Success and failure are both
//! terminal; a failed request becomes a failed `ActionResult`, nothing
//! aborts.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::connector::Connector;
use crate::model::{ActionRequest, ActionResult};

pub async fn invoke(connector: Arc<dyn Connector>,
                    operation: &str,
                    requests: Vec<ActionRequest>)
                    -> Vec<ActionResult> {
    let calls = requests.into_iter().map(|request| {
                                        let connector = Arc::clone(&connector);
                                        let operation = operation.to_string();
                                        async move { dispatch_one(connector, &operation, request).await }
                                    });
    join_all(calls).await
}

async fn dispatch_one(connector: Arc<dyn Connector>, operation: &str, request: ActionRequest) -> ActionResult {
    match connector.call(operation, &request.params).await {
        Ok(output) => ActionResult { parameter: request.params,
                                     data: output.data,
                                     success: true,
                                     message: output.message,
                                     context_artifact: request.context_artifact },
        Err(err) => {
            log::warn!("request against {}::{} failed: {}", connector.name(), operation, err);
            ActionResult { parameter: request.params,
                           data: Vec::new(),
                           success: false,
                           message: Some(err.to_string()),
                           context_artifact: request.context_artifact }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{CallOutput, ConnectorError};
    use async_trait::async_trait;
    use serde_json::json;

    /// Fails every request whose `uuid` parameter is "bad".
    struct Flaky;

    #[async_trait]
    impl Connector for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn call(&self, _operation: &str, params: &Value) -> Result<CallOutput, ConnectorError> {
            if params.get("uuid") == Some(&json!("bad")) {
                return Err(ConnectorError::Failed("device unreachable".into()));
            }
            Ok(CallOutput::rows(vec![json!({"status": "locked"})]))
        }
    }

    #[tokio::test]
    async fn fan_out_records_every_terminal_outcome() {
        let requests = vec![ActionRequest { params: json!({"uuid": "U1"}),
                                            context_artifact: Some(1) },
                            ActionRequest { params: json!({"uuid": "bad"}),
                                            context_artifact: Some(2) }];
        let results = invoke(Arc::new(Flaky), "lock device", requests).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].message.as_deref(), Some("device unreachable"));
        assert_eq!(results[1].context_artifact, Some(2));
    }
}
