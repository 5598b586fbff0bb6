//! Detached task submission

use std::future::Future;

use tokio::task::JoinHandle;

use super::NotifyError;

/// Runs side effects on the tokio runtime, outside the caller's
/// cancellation scope. Nothing is retried.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher;

impl Dispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Submit a unit of work. A failure is logged at warn and dropped.
    /// The handle exists for tests; callers are free to drop it.
    pub fn submit<F>(&self, task: &'static str, work: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), NotifyError>> + Send + 'static,
    {
        tokio::spawn(async move {
            match work.await {
                Ok(()) => tracing::debug!(task, "Side effect completed"),
                Err(e) => tracing::warn!(task, error = %e, "Side effect failed"),
            }
        })
    }
}
