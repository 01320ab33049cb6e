//! Connection-history event log contract.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One connect/disconnect history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub device_id: String,
    pub device_name: String,
    /// "ONLINE" or "OFFLINE".
    pub status: String,
    /// Raw event payload, if the transport supplied one.
    pub content: String,
    pub occurred_at: DateTime<Utc>,
}

/// Best-effort append of connection history.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn insert_event(&self, event: ConnectionEvent) -> Result<()>;
}

#[async_trait]
impl<T: EventLog + ?Sized> EventLog for Arc<T> {
    async fn insert_event(&self, event: ConnectionEvent) -> Result<()> {
        (**self).insert_event(event).await
    }
}
