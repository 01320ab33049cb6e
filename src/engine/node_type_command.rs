//! Command node: pushes the message data back to the originating device.
//!
//! The serialized data is handed to the configured [`Transport`], which owns
//! the device-specific delivery (UDP datagram, MQTT publish, and so on).

use super::message::ChainMessage;
use super::node::{ChainNode, NodeHandler, NodeOutcome};
use crate::constants::LABEL_SUCCESS;
use crate::transport::Transport;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct CommandHandler {
    transport: Arc<dyn Transport>,
}

impl CommandHandler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl NodeHandler for CommandHandler {
    async fn handle(&self, node: &ChainNode, message: ChainMessage) -> Result<NodeOutcome> {
        let device_id = message
            .device_id()
            .ok_or_else(|| anyhow::anyhow!("Command node requires device id metadata"))?;

        let payload = serde_json::to_vec(&message.data)?;
        self.transport.send(device_id, &payload).await?;

        debug!(
            node = %node.id,
            device = %device_id,
            bytes = payload.len(),
            "Command delivered to device"
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
    use crate::constants::NODE_TYPE_COMMAND;
    use crate::event::EventKind;
    use crate::identity::IdentityContext;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, device_id: &str, payload: &[u8]) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((device_id.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sends_serialized_data_to_device() {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        });
        let handler = CommandHandler::new(transport.clone());

        let node = ChainNode {
            id: "c1".to_string(),
            name: String::new(),
            node_type: NODE_TYPE_COMMAND.to_string(),
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
        let message = ChainMessage::new(&identity, EventKind::Telemetry, json!({"cmd": "reboot"}));

        let outcome = handler.handle(&node, message).await.unwrap();
        assert!(matches!(outcome, NodeOutcome::Route { label, .. } if label == "Success"));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "d-1");
        assert_eq!(sent[0].1, serde_json::to_vec(&json!({"cmd": "reboot"})).unwrap());
    }
}
