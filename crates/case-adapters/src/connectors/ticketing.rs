//! In-memory ticketing service.
//!
//! Retains every created ticket so tests and demos can assert on what was
//! filed and with which report text.

use std::sync::Mutex;

use async_trait::async_trait;
use case_core::{CallOutput, Connector, ConnectorError};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: u64,
    pub short_description: String,
    pub description: String,
}

#[derive(Debug, Default)]
pub struct TicketingConnector {
    tickets: Mutex<Vec<Ticket>>,
}

impl TicketingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tickets filed so far, in creation order.
    pub fn tickets(&self) -> Vec<Ticket> {
        self.tickets.lock().expect("ticket state poisoned").clone()
    }
}

#[async_trait]
impl Connector for TicketingConnector {
    fn name(&self) -> &str {
        "ticketing"
    }

    async fn call(&self, operation: &str, params: &Value) -> Result<CallOutput, ConnectorError> {
        if operation != "create ticket" {
            return Err(ConnectorError::UnsupportedOperation(operation.to_string()));
        }
        let mut tickets = self.tickets.lock().expect("ticket state poisoned");
        let ticket = Ticket { id: tickets.len() as u64 + 1,
                              short_description: params.get("short_description")
                                                       .and_then(Value::as_str)
                                                       .unwrap_or_default()
                                                       .to_string(),
                              description: params.get("description")
                                                 .and_then(Value::as_str)
                                                 .unwrap_or_default()
                                                 .to_string() };
        let id = ticket.id;
        tickets.push(ticket);
        log::info!("created ticket {id}");
        Ok(CallOutput { data: vec![json!({ "id": id })],
                        message: Some(format!("ticket {id} created")) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tickets_are_retained_in_creation_order() {
        let connector = TicketingConnector::new();
        for description in ["first", "second"] {
            connector.call("create ticket",
                           &json!({ "short_description": "Lost/Stolen Mobile Device",
                                    "description": description }))
                     .await
                     .unwrap();
        }
        let tickets = connector.tickets();
        assert_eq!(tickets.len(), 2);
        assert_eq!((tickets[0].id, tickets[1].id), (1, 2));
        assert_eq!(tickets[1].description, "second");
    }

    #[tokio::test]
    async fn unknown_operations_are_rejected() {
        let connector = TicketingConnector::new();
        let err = connector.call("close ticket", &json!({})).await.unwrap_err();
        assert!(matches!(err, ConnectorError::UnsupportedOperation(_)));
    }
}
