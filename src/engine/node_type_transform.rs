//! Transform node: rewrites message data through a template.
//!
//! The payload is a template document whose fields may be JSON Logic
//! expressions evaluated against the incoming data. The transformed value
//! replaces the message data and routes along the `Success` edge.

use super::common::evaluate_template;
use super::message::ChainMessage;
use super::node::{ChainNode, NodeHandler, NodeOutcome};
use crate::constants::LABEL_SUCCESS;
use anyhow::Result;
use async_trait::async_trait;

pub struct TransformHandler;

impl TransformHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TransformHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for TransformHandler {
    async fn handle(&self, node: &ChainNode, message: ChainMessage) -> Result<NodeOutcome> {
        let transformed = evaluate_template(&node.payload, &message.data)?;

        Ok(NodeOutcome::Route {
            label: LABEL_SUCCESS.to_string(),
            message: message.with_data(transformed),
        })
    }
}
