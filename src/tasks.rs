//! Background task lifecycle helpers.

use std::future::Future;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info};

/// Spawn a long-running task wired into application shutdown.
///
/// The task is raced against the application token, so it stops on either
/// its own completion or app shutdown. When the task itself fails, the
/// application token is cancelled so the rest of the process winds down
/// instead of running headless.
pub fn spawn_cancellable_task<F, Fut>(
    tracker: &TaskTracker,
    app_token: CancellationToken,
    task_builder: F,
) where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    info!("Starting cancellable background task");

    let task_token = app_token.clone();

    tracker.spawn(async move {
        tokio::select! {
            result = task_builder(app_token.clone()) => {
                match result {
                    Ok(()) => {
                        info!("Background task completed");
                    }
                    Err(e) => {
                        error!(error = ?e, "Background task failed, shutting down");
                        task_token.cancel();
                    }
                }
            }
            () = task_token.cancelled() => {
                info!("Background task stopping on shutdown signal");
            }
        }
    });
}
