//! Filter node: routes a message along the `True` or `False` edge.
//!
//! The payload is either a bare boolean or a JSON Logic expression evaluated
//! against the message data. An evaluation failure is not fatal: the message
//! falls back to the `False` branch so a broken predicate degrades to "does
//! not match" instead of dropping the message.

use super::common::evaluate_json_logic;
use super::message::ChainMessage;
use super::node::{ChainNode, NodeHandler, NodeOutcome};
use crate::constants::{LABEL_FALSE, LABEL_TRUE};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

pub struct FilterHandler;

impl FilterHandler {
    pub fn new() -> Self {
        Self
    }

    fn evaluate(&self, node: &ChainNode, message: &ChainMessage) -> Result<bool> {
        match &node.payload {
            Value::Bool(value) => Ok(*value),
            Value::Object(_) => {
                let result = evaluate_json_logic(&node.payload, &message.data)?;
                result.as_bool().ok_or_else(|| {
                    anyhow::anyhow!("Filter expression produced non-boolean result: {}", result)
                })
            }
            other => Err(anyhow::anyhow!(
                "Filter payload must be a boolean or JSON Logic object, got: {}",
                other
            )),
        }
    }
}

impl Default for FilterHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for FilterHandler {
    async fn handle(&self, node: &ChainNode, message: ChainMessage) -> Result<NodeOutcome> {
        let matched = match self.evaluate(node, &message) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(
                    node = %node.id,
                    error = ?e,
                    "Filter evaluation failed, routing to False branch"
                );
                false
            }
        };

        let label = if matched { LABEL_TRUE } else { LABEL_FALSE };
        Ok(NodeOutcome::Route {
            label: label.to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NODE_TYPE_FILTER;
    use crate::event::EventKind;
    use crate::identity::IdentityContext;
    use serde_json::json;

    fn node(payload: Value) -> ChainNode {
        ChainNode {
            id: "f1".to_string(),
            name: String::new(),
            node_type: NODE_TYPE_FILTER.to_string(),
            payload,
            configuration: json!({}),
        }
    }

    fn message(data: Value) -> ChainMessage {
        let identity = IdentityContext {
            device_id: "d-1".to_string(),
            device_name: "sensor-a".to_string(),
            device_type: "sensor".to_string(),
            product_id: "p-1".to_string(),
            org_id: "org-1".to_string(),
            owner: "alice".to_string(),
        };
        ChainMessage::new(&identity, EventKind::Telemetry, data)
    }

    fn label(outcome: NodeOutcome) -> String {
        match outcome {
            NodeOutcome::Route { label, .. } => label,
            NodeOutcome::Halt => panic!("expected route"),
        }
    }

    #[tokio::test]
    async fn test_matching_expression_routes_true() {
        let handler = FilterHandler::new();
        let node = node(json!({">": [{"val": ["temp"]}, 30]}));

        let outcome = handler.handle(&node, message(json!({"temp": 42}))).await.unwrap();
        assert_eq!(label(outcome), "True");
    }

    #[tokio::test]
    async fn test_non_matching_expression_routes_false() {
        let handler = FilterHandler::new();
        let node = node(json!({">": [{"val": ["temp"]}, 30]}));

        let outcome = handler.handle(&node, message(json!({"temp": 12}))).await.unwrap();
        assert_eq!(label(outcome), "False");
    }

    #[tokio::test]
    async fn test_boolean_payload_short_circuits() {
        let handler = FilterHandler::new();

        let outcome = handler.handle(&node(json!(true)), message(json!({}))).await.unwrap();
        assert_eq!(label(outcome), "True");

        let outcome = handler.handle(&node(json!(false)), message(json!({}))).await.unwrap();
        assert_eq!(label(outcome), "False");
    }

    #[tokio::test]
    async fn test_evaluation_failure_falls_back_to_false() {
        let handler = FilterHandler::new();
        // Numeric payloads are not valid filter expressions.
        let node = node(json!(42));

        let outcome = handler.handle(&node, message(json!({"temp": 42}))).await.unwrap();
        assert_eq!(label(outcome), "False");
    }

    #[tokio::test]
    async fn test_message_passes_through_unmodified() {
        let handler = FilterHandler::new();
        let node = node(json!(true));
        let input = message(json!({"temp": 42}));
        let original_data = input.data.clone();

        match handler.handle(&node, input).await.unwrap() {
            NodeOutcome::Route { message, .. } => assert_eq!(message.data, original_data),
            NodeOutcome::Halt => panic!("expected route"),
        }
    }
}
