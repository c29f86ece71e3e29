//! Per-operation deadline and cancellation.
//!
//! Every host call gets its own [`OperationContext`]. Remote calls and
//! long-running-operation waits are raced against the context: whichever of
//! completion, deadline, or cancellation comes first wins.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::ApiError;

/// Deadline and cancellation token for one host operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl OperationContext {
    /// A context that expires after `timeout` and is never cancelled.
    pub fn new(timeout: Duration) -> Self {
        Self::with_token(timeout, CancellationToken::new())
    }

    /// A context that expires after `timeout` or when `cancel` fires.
    pub fn with_token(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    /// When this operation times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the host has cancelled this operation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a remote call under this context.
    ///
    /// Returns [`ApiError::Cancelled`] or [`ApiError::Timeout`] if the
    /// context ends first; the in-flight future is dropped.
    pub async fn run<F, T>(&self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ApiError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(ApiError::Timeout),
            result = call => result,
        }
    }
}
