//! Commit creation
//!
//! The parent is always the head SHA captured at run start. If the platform
//! rejects it as stale the run fails with `Conflict`; there is no automatic
//! rebase.

use crate::error::Result;
use crate::platform::GitDataService;
use crate::publish::RemoteCaller;
use crate::types::{Commit, PipelineStep};
use tracing::debug;

/// Create the commit linking `tree_sha` to `parent_sha`
pub async fn create_commit(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    message: &str,
    tree_sha: &str,
    parent_sha: &str,
) -> Result<Commit> {
    let sha = caller
        .call(PipelineStep::CommitCreated, "create commit", || {
            service.create_commit(message, tree_sha, parent_sha)
        })
        .await?;

    debug!(sha = %sha, tree_sha, parent_sha, "commit created");
    Ok(Commit {
        message: message.to_string(),
        tree_sha: tree_sha.to_string(),
        parent_sha: parent_sha.to_string(),
        sha,
    })
}
