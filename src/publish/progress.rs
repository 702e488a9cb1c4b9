//! Progress callback trait for interface-agnostic updates
//!
//! This trait allows different interfaces (CLI, web server, etc.) to receive
//! progress updates while a publish run executes.

use crate::error::Error;
use crate::types::PipelineStep;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of the compensating branch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    /// Branch deleted
    Deleted,
    /// Branch was not on the remote; nothing to delete
    Absent,
    /// Delete failed; the branch is orphaned
    Failed(String),
}

/// Progress callback trait
///
/// Implement this trait to receive progress updates during a run.
/// - CLI implementations can print to terminal
/// - Web servers can send SSE or WebSocket messages
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when the run reaches a step (including `Failed`)
    async fn on_step(&self, step: PipelineStep);

    /// Called before sleeping ahead of a retry
    async fn on_retry(&self, step: PipelineStep, attempt: u32, delay: Duration, error: &Error);

    /// Called after the compensating branch delete
    async fn on_cleanup(&self, branch: &str, status: CleanupStatus);

    /// Called with a general status message
    async fn on_message(&self, message: &str);
}

/// No-op progress callback for testing or when progress isn't needed
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_step(&self, _step: PipelineStep) {}
    async fn on_retry(
        &self,
        _step: PipelineStep,
        _attempt: u32,
        _delay: Duration,
        _error: &Error,
    ) {
    }
    async fn on_cleanup(&self, _branch: &str, _status: CleanupStatus) {}
    async fn on_message(&self, _message: &str) {}
}
