//! Repository context resolution
//!
//! Captures the default branch and its head commit once, at run start. The
//! rest of the run works from this snapshot and never re-reads the head.

use crate::error::{Error, Result};
use crate::platform::GitDataService;
use crate::publish::RemoteCaller;
use crate::types::{PipelineStep, RepositoryContext};
use tracing::debug;

/// Fetch the default branch and its head commit SHA
pub async fn resolve_repository_context(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
) -> Result<RepositoryContext> {
    let step = PipelineStep::RepoResolved;
    let repo = service.repo();

    let default_branch = caller
        .call(step, "get repository", || service.get_default_branch())
        .await?;
    if default_branch.is_empty() {
        return Err(Error::NotFound(format!("{repo} has no default branch")));
    }

    let head_commit_sha = caller
        .call(step, "get default branch ref", || {
            service.get_branch_head(&default_branch)
        })
        .await?;

    debug!(
        repo = %repo,
        default_branch = %default_branch,
        head = %head_commit_sha,
        "resolved repository context"
    );

    Ok(RepositoryContext {
        owner: repo.owner.clone(),
        name: repo.name.clone(),
        default_branch,
        head_commit_sha,
    })
}
