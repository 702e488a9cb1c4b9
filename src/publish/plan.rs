//! Dry-run planning
//!
//! Resolves everything a run would do using read-only calls, and nothing
//! else. The branch name in a plan is a fresh proposal; a real run draws
//! its own.

use crate::config::PipelineConfig;
use crate::error::{PipelineFailure, Result};
use crate::platform::GitDataService;
use crate::publish::context::resolve_repository_context;
use crate::publish::naming::{BranchNamer, derive_test_path};
use crate::publish::{CancelSignal, NoopProgress, RemoteCaller};
use crate::types::{BranchProposal, PipelineStep, PublishJob, RepoId, RepositoryContext};
use serde::Serialize;
use std::fmt;

/// What a publish run would create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishPlan {
    /// Target repository
    pub repo: RepoId,
    /// Default branch and head at planning time
    pub context: RepositoryContext,
    /// Branch the run would create
    pub branch: BranchProposal,
    /// Source file the tests belong to
    pub source_path: String,
    /// Where the test file would be written
    pub test_file_path: String,
    /// Commit message
    pub commit_message: String,
    /// Pull request title
    pub title: String,
    /// Pull request body
    pub body: String,
}

impl fmt::Display for PublishPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "repository:  {}", self.repo)?;
        writeln!(
            f,
            "base:        {} @ {}",
            self.context.default_branch,
            short_sha(&self.context.head_commit_sha)
        )?;
        writeln!(f, "branch:      {}", self.branch.name)?;
        writeln!(f, "test file:   {} (for {})", self.test_file_path, self.source_path)?;
        writeln!(f, "commit:      {}", self.commit_message)?;
        write!(f, "title:       {}", self.title)
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Plan a run without writing anything
pub async fn plan_publish(
    service: &dyn GitDataService,
    config: &PipelineConfig,
    job: &PublishJob,
    cancel: &CancelSignal,
) -> Result<PublishPlan> {
    let test_file_path = derive_test_path(&job.file_path, &config.test_suffix)
        .map_err(|e| PipelineFailure::at(PipelineStep::Init, &e))?;

    let policy = config.retry_policy();
    let caller = RemoteCaller::new(&policy, cancel, &NoopProgress);
    let context = resolve_repository_context(service, &caller)
        .await
        .map_err(|e| PipelineFailure::at(PipelineStep::RepoResolved, &e))?;

    let branch = BranchNamer::new(&config.branch_prefix).propose(&context.head_commit_sha);

    Ok(PublishPlan {
        repo: service.repo().clone(),
        branch,
        source_path: job.file_path.clone(),
        test_file_path,
        commit_message: config.commit_message_for(&job.file_path),
        title: config.title_for(&job.file_path),
        body: config.body.clone(),
        context,
    })
}
