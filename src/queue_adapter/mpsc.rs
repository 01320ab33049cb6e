//! MPSC channel-based queue adapter for in-memory work queuing.
//!
//! Bounded, fast, and at-most-once: suitable for single-instance
//! deployments where data loss on restart is acceptable. The channel bound
//! is what gives the dispatcher its ingress backpressure.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

use super::QueueAdapter;
use crate::errors::QueueError;

/// Queue adapter wrapping a bounded Tokio MPSC channel.
///
/// The receiver is wrapped in an `Arc<Mutex>` so the adapter can be cloned
/// and shared; only one pull proceeds at a time.
pub struct MpscQueueAdapter<T>
where
    T: Send + Sync + 'static,
{
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
    sender: mpsc::Sender<T>,
}

impl<T> MpscQueueAdapter<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer);
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            sender,
        }
    }

    /// Clone of the sender for producer use.
    pub fn sender(&self) -> mpsc::Sender<T> {
        self.sender.clone()
    }

    pub fn max_capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

#[async_trait]
impl<T> QueueAdapter<T> for MpscQueueAdapter<T>
where
    T: Send + Sync + 'static,
{
    async fn pull(&self) -> Option<T> {
        let mut receiver = self.receiver.lock().await;
        let result = receiver.recv().await;
        trace!(has_item = result.is_some(), "Pulled item from MPSC queue");
        result
    }

    async fn push(&self, work: T) -> Result<()> {
        self.sender
            .send(work)
            .await
            .map_err(|e| QueueError::MpscOperationFailed {
                operation: "send".to_string(),
                details: e.to_string(),
            })?;
        Ok(())
    }

    async fn try_push(&self, work: T) -> Result<()> {
        self.sender.try_send(work).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::CapacityExceeded {
                queue_type: "mpsc".to_string(),
                capacity: self.sender.max_capacity(),
            },
            mpsc::error::TrySendError::Closed(_) => QueueError::MpscOperationFailed {
                operation: "try_send".to_string(),
                details: "Channel closed".to_string(),
            },
        })?;
        Ok(())
    }

    async fn depth(&self) -> Option<usize> {
        // Approximation: the channel does not expose an exact depth.
        Some(self.sender.max_capacity() - self.sender.capacity())
    }

    async fn is_healthy(&self) -> bool {
        !self.sender.is_closed()
    }
}

impl<T> Clone for MpscQueueAdapter<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_pull_fifo() {
        let adapter = Arc::new(MpscQueueAdapter::<i32>::new(10));

        for i in 0..5 {
            adapter.push(i).await.unwrap();
        }
        for expected in 0..5 {
            assert_eq!(adapter.pull().await, Some(expected));
        }
    }

    #[tokio::test]
    async fn test_try_push_when_full() {
        let adapter = Arc::new(MpscQueueAdapter::<i32>::new(1));

        adapter.try_push(1).await.unwrap();
        let result = adapter.try_push(2).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_producers() {
        let adapter = Arc::new(MpscQueueAdapter::<i32>::new(100));
        let mut handles = vec![];

        for i in 0..10 {
            let queue = adapter.clone();
            handles.push(tokio::spawn(async move {
                queue.push(i).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut items = vec![];
        for _ in 0..10 {
            items.push(adapter.pull().await.unwrap());
        }
        items.sort();
        assert_eq!(items, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_depth_tracking() {
        let adapter = Arc::new(MpscQueueAdapter::<i32>::new(10));

        assert_eq!(adapter.depth().await, Some(0));
        for i in 0..5 {
            adapter.push(i).await.unwrap();
        }
        assert_eq!(adapter.depth().await, Some(5));

        adapter.pull().await;
        assert_eq!(adapter.depth().await, Some(4));
    }

    #[tokio::test]
    async fn test_pull_waits_for_item() {
        let adapter = Arc::new(MpscQueueAdapter::<i32>::new(10));

        let adapter_clone = adapter.clone();
        let pull_handle = tokio::spawn(async move { adapter_clone.pull().await });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        adapter.push(42).await.unwrap();

        assert_eq!(pull_handle.await.unwrap(), Some(42));
    }
}
