//! Log action node: emits the message to the structured log and routes on.
//!
//! Useful as a chain terminal while authoring definitions, and as a cheap
//! audit tap on any edge in production.

use super::message::ChainMessage;
use super::node::{ChainNode, NodeHandler, NodeOutcome};
use crate::constants::LABEL_SUCCESS;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

pub struct LogActionHandler;

impl LogActionHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogActionHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for LogActionHandler {
    async fn handle(&self, node: &ChainNode, message: ChainMessage) -> Result<NodeOutcome> {
        let rendered = serde_json::to_string_pretty(&message.data)
            .unwrap_or_else(|_| message.data.to_string());

        info!(
            node = %node.id,
            message_id = %message.id,
            kind = %message.kind,
            device = message.device_id().unwrap_or("unknown"),
            data = %rendered,
            "Rule chain log action"
        );

        Ok(NodeOutcome::Route {
            label: LABEL_SUCCESS.to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NODE_TYPE_LOG_ACTION;
    use crate::event::EventKind;
    use crate::identity::IdentityContext;
    use serde_json::json;

    #[tokio::test]
    async fn test_routes_success_with_data_untouched() {
        let handler = LogActionHandler::new();
        let node = ChainNode {
            id: "a1".to_string(),
            name: String::new(),
            node_type: NODE_TYPE_LOG_ACTION.to_string(),
            payload: json!({}),
            configuration: json!({}),
        };
        let identity = IdentityContext {
            device_id: "d-1".to_string(),
            device_name: "sensor-a".to_string(),
            device_type: "sensor".to_string(),
            product_id: "p-1".to_string(),
            org_id: "org-1".to_string(),
            owner: "alice".to_string(),
        };
        let input = ChainMessage::new(&identity, EventKind::Telemetry, json!({"temp": 9}));

        match handler.handle(&node, input).await.unwrap() {
            NodeOutcome::Route { label, message } => {
                assert_eq!(label, "Success");
                assert_eq!(message.data, json!({"temp": 9}));
            }
            NodeOutcome::Halt => panic!("expected route"),
        }
    }
}
