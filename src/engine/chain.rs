//! Compiled rule chains: validation, entry selection, and execution.

use super::definition::RuleChainDefinition;
use super::factory::NodeHandlerFactory;
use super::message::ChainMessage;
use super::node::{ChainNode, NodeOutcome};
use crate::errors::EngineError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// Executable form of a [`RuleChainDefinition`].
///
/// Built once per definition and shared read-only across concurrent
/// executions; nothing here mutates after compilation.
pub struct RuleChain {
    id: String,
    entry: String,
    nodes: HashMap<String, ChainNode>,
    /// node id -> (label -> downstream node id)
    routes: HashMap<String, HashMap<String, String>>,
    factory: Arc<NodeHandlerFactory>,
}

impl RuleChain {
    /// Validate a definition and wire it into an executable graph.
    ///
    /// Rejected at compile time: duplicate node ids, unknown node types,
    /// dangling edge endpoints, duplicate (source, label) pairs, zero or
    /// multiple entry candidates, and cycles. The entry node is the unique
    /// node with no incoming edges.
    pub fn compile(
        definition: &RuleChainDefinition,
        factory: Arc<NodeHandlerFactory>,
    ) -> Result<Self, EngineError> {
        let fail = |details: String| EngineError::CompilationFailed {
            chain_id: definition.id.clone(),
            details,
        };

        if definition.nodes.is_empty() {
            return Err(fail("definition has no nodes".to_string()));
        }

        let mut nodes: HashMap<String, ChainNode> = HashMap::with_capacity(definition.nodes.len());
        for node in &definition.nodes {
            if !factory.supports(&node.node_type) {
                return Err(EngineError::UnknownNodeType {
                    node_type: node.node_type.clone(),
                });
            }
            if nodes.insert(node.id.clone(), node.clone()).is_some() {
                return Err(fail(format!("duplicate node id: {}", node.id)));
            }
        }

        let mut routes: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut has_incoming: HashSet<&str> = HashSet::new();
        for edge in &definition.edges {
            if !nodes.contains_key(&edge.from) {
                return Err(fail(format!("edge references unknown source: {}", edge.from)));
            }
            if !nodes.contains_key(&edge.to) {
                return Err(fail(format!("edge references unknown target: {}", edge.to)));
            }
            let previous = routes
                .entry(edge.from.clone())
                .or_default()
                .insert(edge.label.clone(), edge.to.clone());
            if previous.is_some() {
                return Err(fail(format!(
                    "duplicate edge for ({}, {})",
                    edge.from, edge.label
                )));
            }
            has_incoming.insert(edge.to.as_str());
        }

        let mut entries = definition
            .nodes
            .iter()
            .filter(|node| !has_incoming.contains(node.id.as_str()))
            .map(|node| node.id.clone());
        let entry = entries
            .next()
            .ok_or_else(|| fail("no entry node: every node has an incoming edge".to_string()))?;
        if let Some(other) = entries.next() {
            return Err(fail(format!(
                "ambiguous entry node: both {entry} and {other} have no incoming edges"
            )));
        }

        detect_cycles(&definition.id, &nodes, &routes)?;

        Ok(Self {
            id: definition.id.clone(),
            entry,
            nodes,
            routes,
            factory,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Execute the chain against one message.
    ///
    /// Routing follows each handler's label until a handler halts or no edge
    /// carries the chosen label; both end the path successfully. A handler
    /// error aborts the remaining routing for this message.
    pub async fn execute(&self, message: ChainMessage) -> Result<(), EngineError> {
        let mut current = self.entry.as_str();
        let mut message = message;

        loop {
            // Compilation guarantees every routed-to id exists.
            let Some(node) = self.nodes.get(current) else {
                break;
            };

            let outcome = self.factory.handle(node, message).await.map_err(|e| {
                EngineError::ExecutionFailed {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                    details: e.to_string(),
                }
            })?;

            match outcome {
                NodeOutcome::Halt => {
                    trace!(chain = %self.id, node = %node.id, "Node halted chain");
                    break;
                }
                NodeOutcome::Route {
                    label,
                    message: next_message,
                } => match self.routes.get(current).and_then(|edges| edges.get(&label)) {
                    Some(next) => {
                        trace!(chain = %self.id, from = %node.id, label = %label, to = %next, "Routing message");
                        current = next;
                        message = next_message;
                    }
                    None => {
                        trace!(chain = %self.id, node = %node.id, label = %label, "No edge for label, path terminates");
                        break;
                    }
                },
            }
        }

        Ok(())
    }
}

fn detect_cycles(
    chain_id: &str,
    nodes: &HashMap<String, ChainNode>,
    routes: &HashMap<String, HashMap<String, String>>,
) -> Result<(), EngineError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(nodes.len());

    for start in nodes.keys() {
        if marks.contains_key(start.as_str()) {
            continue;
        }
        // Iterative DFS; the stack entry tracks remaining successors.
        let mut stack: Vec<(&str, Vec<&str>)> = vec![(start.as_str(), successors(routes, start))];
        marks.insert(start.as_str(), Mark::InProgress);

        while let Some((node, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(next) => match marks.get(next) {
                    Some(Mark::InProgress) => {
                        return Err(EngineError::CompilationFailed {
                            chain_id: chain_id.to_string(),
                            details: format!("cycle detected through node {next}"),
                        });
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::InProgress);
                        stack.push((next, successors(routes, next)));
                    }
                },
                None => {
                    marks.insert(*node, Mark::Done);
                    stack.pop();
                }
            }
        }
    }

    Ok(())
}

fn successors<'a>(
    routes: &'a HashMap<String, HashMap<String, String>>,
    node: &str,
) -> Vec<&'a str> {
    routes
        .get(node)
        .map(|edges| edges.values().map(String::as_str).collect())
        .unwrap_or_default()
}
