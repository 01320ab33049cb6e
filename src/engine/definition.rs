//! Declarative JSON wire form of a rule chain.
//!
//! A definition lists node specifications and directed, label-tagged edges
//! between node ids. The document must round-trip losslessly through
//! [`RuleChainDefinition::from_json`] / [`RuleChainDefinition::to_json`].

use super::node::ChainNode;
use crate::errors::EngineError;
use serde::{Deserialize, Serialize};

/// Directed, label-tagged edge between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    pub label: String,
}

/// Declarative description of a node graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleChainDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<ChainNode>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl RuleChainDefinition {
    pub fn from_json(document: &str) -> Result<Self, EngineError> {
        serde_json::from_str(document).map_err(|source| EngineError::DefinitionParseFailed { source })
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(|source| EngineError::DefinitionParseFailed { source })
    }
}
