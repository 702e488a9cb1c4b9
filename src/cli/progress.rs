//! CLI progress callback with styled output and a spinner

use crate::cli::style::{Stylize, check, cross, spinner_style};
use anstream::eprintln;
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::time::Duration;
use testcase_pr::error::Error;
use testcase_pr::publish::{CleanupStatus, ProgressCallback};
use testcase_pr::types::PipelineStep;

/// Progress for `tcpr publish`
///
/// Status goes to stderr so stdout stays clean for the URL or JSON.
/// - interactive: spinner naming the step in flight
/// - quiet: no spinner, only retries and cleanup are reported
pub struct CliProgress {
    spinner: Option<ProgressBar>,
}

impl CliProgress {
    /// Progress with a spinner
    pub fn interactive() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message(describe(PipelineStep::Init));
        Self {
            spinner: Some(spinner),
        }
    }

    /// Progress without a spinner (JSON output, non-interactive use)
    pub const fn quiet() -> Self {
        Self { spinner: None }
    }

    /// Stop the spinner, if any
    pub fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }

    fn println(&self, line: &str) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    }
}

/// What the run is doing once `step` has been reached
const fn describe(step: PipelineStep) -> &'static str {
    match step {
        PipelineStep::Init => "Resolving repository...",
        PipelineStep::RepoResolved => "Creating branch...",
        PipelineStep::BranchCreated => "Uploading test file...",
        PipelineStep::BlobCreated => "Creating tree...",
        PipelineStep::TreeCreated => "Creating commit...",
        PipelineStep::CommitCreated => "Updating branch...",
        PipelineStep::RefUpdated => "Opening pull request...",
        PipelineStep::RequestOpened => "Done",
        PipelineStep::Failed => "Failed",
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_step(&self, step: PipelineStep) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(describe(step));
        }
    }

    async fn on_retry(&self, step: PipelineStep, attempt: u32, delay: Duration, error: &Error) {
        self.println(&format!(
            "  {} {step}: attempt {attempt} failed ({error}), retrying in {delay:?}",
            "!".warn().for_stderr()
        ));
    }

    async fn on_cleanup(&self, branch: &str, status: CleanupStatus) {
        match status {
            CleanupStatus::Deleted => {
                self.println(&format!(
                    "  {} Deleted branch {}",
                    check().for_stderr(),
                    branch.accent().for_stderr()
                ));
            }
            CleanupStatus::Absent => {
                self.println(&format!(
                    "  {} Branch {} was never created",
                    check().for_stderr(),
                    branch.accent().for_stderr()
                ));
            }
            CleanupStatus::Failed(reason) => {
                self.println(&format!(
                    "  {} Could not delete branch {}: {}",
                    cross().for_stderr(),
                    branch.accent().for_stderr(),
                    reason.error().for_stderr()
                ));
            }
        }
    }

    async fn on_message(&self, message: &str) {
        self.println(&format!("{}", message.muted().for_stderr()));
    }
}
