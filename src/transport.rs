//! Outbound transport contract.
//!
//! The wire listeners (UDP/TCP device links) live outside this core. The
//! only capability the core needs from them is delivering raw bytes to a
//! device over its open connection handle.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, device_id: &str, payload: &[u8]) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, device_id: &str, payload: &[u8]) -> Result<()> {
        (**self).send(device_id, payload).await
    }
}

/// Default transport for deployments where no downlink is wired.
#[derive(Debug, Clone, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for NoOpTransport {
    async fn send(&self, _device_id: &str, _payload: &[u8]) -> Result<()> {
        Ok(())
    }
}
