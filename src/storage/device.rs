//! Device repository contract.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Persists device connectivity status transitions.
///
/// Status values are the strings in [`crate::constants::STATUS_ONLINE`] and
/// [`crate::constants::STATUS_OFFLINE`]. Failures are logged by callers and
/// never abort event processing.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn update_status(&self, device_id: &str, status: &str) -> Result<()>;
}

#[async_trait]
impl<T: DeviceRepository + ?Sized> DeviceRepository for Arc<T> {
    async fn update_status(&self, device_id: &str, status: &str) -> Result<()> {
        (**self).update_status(device_id, status).await
    }
}
