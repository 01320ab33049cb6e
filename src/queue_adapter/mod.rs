//! Generic queue adapter for inbound work.
//!
//! A trait-based abstraction so the dispatcher does not care where events
//! come from: the in-memory MPSC implementation here serves single-instance
//! deployments, and a distributed backend can be slotted in behind the same
//! trait.

use anyhow::Result;
use async_trait::async_trait;

mod mpsc;

pub use mpsc::MpscQueueAdapter;

/// Common interface for work queues.
///
/// Implementations must be `Send + Sync`; the dispatcher shares one adapter
/// between the producer side (`push`) and its single reader (`pull`).
#[async_trait]
pub trait QueueAdapter<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Pull the next work item, waiting until one is available.
    ///
    /// Returns `None` when the queue is closed and drained.
    async fn pull(&self) -> Option<T>;

    /// Push a work item, waiting while the queue is full.
    async fn push(&self, work: T) -> Result<()>;

    /// Push without blocking; fails immediately when the queue is full.
    async fn try_push(&self, work: T) -> Result<()> {
        self.push(work).await
    }

    /// Approximate number of queued items, if the backend can report it.
    async fn depth(&self) -> Option<usize> {
        None
    }

    /// Whether the queue is still operational.
    async fn is_healthy(&self) -> bool {
        true
    }
}
