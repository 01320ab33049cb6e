//! Outbound UI session notification.
//!
//! Telemetry fan-out to connected UI sessions is strictly fire-and-forget:
//! the dispatcher spawns the broadcast and never waits on or surfaces its
//! outcome.

use crate::constants::ENVELOPE_TYPE_TELEMETRY;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Fan-out to all active UI sessions watching a device.
#[async_trait]
pub trait SessionBroadcaster: Send + Sync {
    async fn broadcast(&self, device_id: &str, message: &Value) -> Result<()>;
}

#[async_trait]
impl<T: SessionBroadcaster + ?Sized> SessionBroadcaster for Arc<T> {
    async fn broadcast(&self, device_id: &str, message: &Value) -> Result<()> {
        (**self).broadcast(device_id, message).await
    }
}

/// Wrap decoded telemetry in the wire envelope UI sessions expect.
pub fn telemetry_envelope(content: &Value) -> Value {
    json!({
        "type": ENVELOPE_TYPE_TELEMETRY,
        "content": content,
    })
}

/// Default broadcaster for deployments without a UI session layer.
#[derive(Debug, Clone, Default)]
pub struct NoOpSessionBroadcaster;

impl NoOpSessionBroadcaster {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionBroadcaster for NoOpSessionBroadcaster {
    async fn broadcast(&self, _device_id: &str, _message: &Value) -> Result<()> {
        Ok(())
    }
}
