//! The unit of work passed through a rule chain.

use crate::constants::{
    METADATA_DEVICE_ID, METADATA_DEVICE_NAME, METADATA_DEVICE_TYPE, METADATA_ORG_ID,
    METADATA_OWNER, METADATA_PRODUCT_ID,
};
use crate::event::EventKind;
use crate::identity::IdentityContext;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// One decoded event flowing through the node graph.
///
/// Immutable from the engine's perspective: nodes read the message, and a
/// node that needs to transform data constructs a replacement via
/// [`ChainMessage::with_data`].
#[derive(Debug, Clone)]
pub struct ChainMessage {
    pub id: Uuid,
    pub kind: EventKind,
    pub owner: String,
    /// Decoded payload fields.
    pub data: Value,
    /// Identity fields carried alongside the data for node use.
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ChainMessage {
    pub fn new(identity: &IdentityContext, kind: EventKind, data: Value) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(METADATA_DEVICE_ID.to_string(), identity.device_id.clone());
        metadata.insert(
            METADATA_DEVICE_NAME.to_string(),
            identity.device_name.clone(),
        );
        metadata.insert(
            METADATA_DEVICE_TYPE.to_string(),
            identity.device_type.clone(),
        );
        metadata.insert(METADATA_PRODUCT_ID.to_string(), identity.product_id.clone());
        metadata.insert(METADATA_ORG_ID.to_string(), identity.org_id.clone());
        metadata.insert(METADATA_OWNER.to_string(), identity.owner.clone());

        Self {
            id: Uuid::new_v4(),
            kind,
            owner: identity.owner.clone(),
            data,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Replacement message with new data; identity metadata and provenance
    /// carry over unchanged.
    pub fn with_data(&self, data: Value) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            owner: self.owner.clone(),
            data,
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_DEVICE_ID).map(String::as_str)
    }
}
