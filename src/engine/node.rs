//! Core trait definition for node handling in the rule-chain engine.
//!
//! Every node type implements [`NodeHandler`]. A handler processes one
//! [`ChainMessage`] and returns a [`NodeOutcome`]: either a routing label
//! plus the message to forward (possibly a transformed replacement), or a
//! halt that ends the path.

use super::message::ChainMessage;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One instantiated node of a compiled chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainNode {
    /// Stable id, unique within the chain.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Type name used for factory dispatch.
    pub node_type: String,
    /// Node logic, typically a JSON Logic expression or template.
    #[serde(default)]
    pub payload: Value,
    /// Type-specific configuration.
    #[serde(default)]
    pub configuration: Value,
}

/// Result of handling one message.
#[derive(Debug)]
pub enum NodeOutcome {
    /// Forward `message` along the edge tagged with `label`. When no edge
    /// carries that label, the path terminates silently.
    Route { label: String, message: ChainMessage },
    /// End the path without routing further.
    Halt,
}

/// Behavior contract for a node type.
///
/// Handlers are shared across concurrent chain executions and must not
/// retain per-message mutable state.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Handle one message.
    ///
    /// * `Ok(NodeOutcome::Route { .. })` routes onward.
    /// * `Ok(NodeOutcome::Halt)` ends the path normally.
    /// * `Err(_)` aborts the remaining routing for this message; the engine
    ///   surfaces it as a chain execution failure.
    async fn handle(&self, node: &ChainNode, message: ChainMessage) -> Result<NodeOutcome>;
}
