//! Branch ref management
//!
//! Create, fast-forward and (on failure) delete the run's branch.

use crate::error::{Error, Result};
use crate::platform::GitDataService;
use crate::publish::{CancelSignal, CleanupStatus, ProgressCallback, RemoteCaller};
use crate::types::{BranchProposal, PipelineStep};
use tracing::{debug, info, warn};

/// Create the branch at its base SHA
///
/// Fails with `Conflict` if the name is taken. When an earlier attempt of
/// this same call timed out or failed transiently, a `Conflict` may just
/// mean that attempt landed; the branch is adopted if it points at the
/// proposal's base.
pub async fn create_ref(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    proposal: &BranchProposal,
) -> Result<()> {
    let mut attempts = 0u32;
    let created = caller
        .call(PipelineStep::BranchCreated, "create ref", || {
            attempts += 1;
            service.create_ref(&proposal.name, &proposal.base_sha)
        })
        .await;

    match created {
        Ok(()) => {}
        Err(Error::Conflict(msg)) if attempts > 1 => {
            let head = caller
                .call(PipelineStep::BranchCreated, "get branch head", || {
                    service.get_branch_head(&proposal.name)
                })
                .await?;
            if head != proposal.base_sha {
                return Err(Error::Conflict(msg));
            }
            info!(branch = %proposal.name, "adopting branch created by an earlier attempt");
        }
        Err(e) => return Err(e),
    }
    debug!(branch = %proposal.name, base = %proposal.base_sha, "branch created");
    Ok(())
}

/// Fast-forward the branch to the new commit
pub async fn update_ref(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    branch: &str,
    commit_sha: &str,
) -> Result<()> {
    caller
        .call(PipelineStep::RefUpdated, "update ref", || {
            service.update_ref(branch, commit_sha)
        })
        .await?;
    debug!(branch, commit_sha, "branch updated");
    Ok(())
}

/// Compensating delete for a branch the run created
///
/// Armed once the branch exists. [`BranchCleanup::run`] issues at most one
/// delete no matter how often it is called; a failed delete is logged and
/// reported to progress, never returned.
#[derive(Debug, Default)]
pub struct BranchCleanup {
    branch: Option<String>,
}

impl BranchCleanup {
    /// Nothing to clean up yet
    pub const fn new() -> Self {
        Self { branch: None }
    }

    /// Record that `branch` exists, or may exist, on the remote
    pub fn arm(&mut self, branch: &str) {
        self.branch = Some(branch.to_string());
    }

    /// The run succeeded; keep the branch
    pub fn disarm(&mut self) {
        self.branch = None;
    }

    /// Branch that would be deleted
    pub fn pending(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Delete the branch if armed; returns whether a delete succeeded
    ///
    /// Runs under the caller's retry policy but ignores cancellation, since
    /// it is itself the response to a cancelled or failed run.
    pub async fn run(
        &mut self,
        service: &dyn GitDataService,
        caller: &RemoteCaller<'_>,
        progress: &dyn ProgressCallback,
    ) -> bool {
        let Some(branch) = self.branch.take() else {
            return false;
        };

        let never = CancelSignal::never();
        let caller = caller.with_cancel(&never);
        let result = caller
            .call(PipelineStep::Failed, "delete ref", || service.delete_ref(&branch))
            .await;

        match result {
            Ok(()) => {
                info!(branch = %branch, "deleted branch of failed run");
                progress.on_cleanup(&branch, CleanupStatus::Deleted).await;
                true
            }
            Err(Error::NotFound(_)) => {
                debug!(branch = %branch, "branch of failed run was never created");
                progress.on_cleanup(&branch, CleanupStatus::Absent).await;
                false
            }
            Err(e) => {
                warn!(branch = %branch, error = %e, "failed to delete branch of failed run");
                progress
                    .on_cleanup(&branch, CleanupStatus::Failed(e.to_string()))
                    .await;
                false
            }
        }
    }
}
