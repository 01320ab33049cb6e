//! Rule-chain engine.
//!
//! A rule chain is a directed graph of typed nodes compiled from a
//! declarative JSON definition. Each node handles one [`message::ChainMessage`]
//! and emits a routing label; the chain follows the label-tagged edge to the
//! next node until a handler halts or no edge matches the chosen label.
//!
//! Node behavior is polymorphic behind [`node::NodeHandler`], with concrete
//! variants registered by type name in [`factory::NodeHandlerFactory`] so a
//! definition can be compiled without compile-time knowledge of every
//! variant.

pub mod chain;
pub mod common;
pub mod definition;
pub mod factory;
pub mod message;
pub mod node;
pub mod node_type_command;
pub mod node_type_filter;
pub mod node_type_log_action;
pub mod node_type_transform;

use crate::constants::{
    NODE_TYPE_COMMAND, NODE_TYPE_FILTER, NODE_TYPE_LOG_ACTION, NODE_TYPE_TRANSFORM,
};
use crate::transport::Transport;
use std::sync::Arc;

pub use chain::RuleChain;
pub use definition::RuleChainDefinition;
pub use factory::NodeHandlerFactory;
pub use message::ChainMessage;
pub use node::{ChainNode, NodeHandler, NodeOutcome};

/// Factory with the standard node catalog registered.
pub fn standard_factory(transport: Arc<dyn Transport>) -> NodeHandlerFactory {
    NodeHandlerFactory::new()
        .register(
            NODE_TYPE_FILTER,
            Arc::new(node_type_filter::FilterHandler::new()),
        )
        .register(
            NODE_TYPE_TRANSFORM,
            Arc::new(node_type_transform::TransformHandler::new()),
        )
        .register(
            NODE_TYPE_LOG_ACTION,
            Arc::new(node_type_log_action::LogActionHandler::new()),
        )
        .register(
            NODE_TYPE_COMMAND,
            Arc::new(node_type_command::CommandHandler::new(transport)),
        )
}
