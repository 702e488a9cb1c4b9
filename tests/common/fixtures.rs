//! Test data factories and a recording progress callback
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use testcase_pr::config::PipelineConfig;
use testcase_pr::error::Error;
use testcase_pr::publish::{CancelHandle, CleanupStatus, ProgressCallback};
use testcase_pr::types::{PipelineStep, PublishJob, RepoId};

/// Generated test content used across tests
pub const GENERATED_TESTS: &str = "const { add } = require('./util');\n\
test('adds numbers', () => {\n  expect(add(1, 2)).toBe(3);\n});\n";

/// Config with short backoff and timeouts, for paused-clock tests
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        max_attempts: 3,
        base_delay_ms: 100,
        backoff_multiplier: 2.0,
        max_delay_ms: 1_000,
        call_timeout_secs: 5,
        ..PipelineConfig::default()
    }
}

/// The repository `MockGitData` serves
pub fn make_repo() -> RepoId {
    RepoId {
        owner: "acme".to_string(),
        name: "widgets".to_string(),
        host: None,
    }
}

/// A job for `src/util.js`
pub fn make_job(content: &str) -> PublishJob {
    make_job_for("src/util.js", content)
}

/// A job for an arbitrary source path
pub fn make_job_for(path: &str, content: &str) -> PublishJob {
    PublishJob {
        repo: make_repo(),
        file_path: path.to_string(),
        generated_content: content.to_string(),
    }
}

/// Progress callback that records everything it is told
///
/// Optionally requests cancellation once a given step is reached.
#[derive(Default)]
pub struct RecordingProgress {
    steps: Mutex<Vec<PipelineStep>>,
    retries: Mutex<Vec<(PipelineStep, u32, Duration)>>,
    cleanups: Mutex<Vec<(String, CleanupStatus)>>,
    messages: Mutex<Vec<String>>,
    cancel_at: Option<(PipelineStep, CancelHandle)>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel through `handle` when `step` is reported
    pub fn cancelling_at(step: PipelineStep, handle: CancelHandle) -> Self {
        Self {
            cancel_at: Some((step, handle)),
            ..Self::default()
        }
    }

    pub fn steps(&self) -> Vec<PipelineStep> {
        self.steps.lock().unwrap().clone()
    }

    pub fn retries(&self) -> Vec<(PipelineStep, u32, Duration)> {
        self.retries.lock().unwrap().clone()
    }

    pub fn cleanups(&self) -> Vec<(String, CleanupStatus)> {
        self.cleanups.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressCallback for RecordingProgress {
    async fn on_step(&self, step: PipelineStep) {
        self.steps.lock().unwrap().push(step);
        if let Some((at, handle)) = &self.cancel_at {
            if *at == step {
                handle.cancel();
            }
        }
    }

    async fn on_retry(&self, step: PipelineStep, attempt: u32, delay: Duration, _error: &Error) {
        self.retries.lock().unwrap().push((step, attempt, delay));
    }

    async fn on_cleanup(&self, branch: &str, status: CleanupStatus) {
        self.cleanups
            .lock()
            .unwrap()
            .push((branch.to_string(), status));
    }

    async fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
