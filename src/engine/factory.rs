//! Factory registry for node handlers.
//!
//! Maps node-type names to handler implementations so a chain definition can
//! be compiled and executed without the engine hard-coding every variant.

use super::message::ChainMessage;
use super::node::{ChainNode, NodeHandler, NodeOutcome};
use crate::errors::EngineError;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of node handlers keyed by type name.
///
/// Shared across threads via `Arc`; registered handlers must be
/// `Send + Sync`.
pub struct NodeHandlerFactory {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl NodeHandlerFactory {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a node type. Builder-style, so registrations
    /// chain.
    pub fn register(mut self, node_type: &str, handler: Arc<dyn NodeHandler>) -> Self {
        self.handlers.insert(node_type.to_string(), handler);
        self
    }

    /// Dispatch one message to the handler registered for the node's type.
    pub async fn handle(&self, node: &ChainNode, message: ChainMessage) -> Result<NodeOutcome> {
        let handler = self
            .handlers
            .get(&node.node_type)
            .ok_or_else(|| EngineError::UnknownNodeType {
                node_type: node.node_type.clone(),
            })?;

        handler.handle(node, message).await
    }

    /// Whether a handler is registered for this node type.
    pub fn supports(&self, node_type: &str) -> bool {
        self.handlers.contains_key(node_type)
    }
}

impl Default for NodeHandlerFactory {
    fn default() -> Self {
        Self::new()
    }
}
