//! Pipeline execution
//!
//! Drives one run through the steps in order:
//! 1. Resolve the default branch and its head
//! 2. Create the run branch at the head
//! 3. Upload the test file, build a tree on the head's tree, commit
//! 4. Fast-forward the branch and open the pull request
//!
//! Any failure after the branch exists deletes it again (once) before the
//! error is returned. A create that was cancelled or ran out of retries may
//! still have landed, so its branch is deleted on a best-effort basis too.

use crate::config::PipelineConfig;
use crate::error::{Error, PipelineFailure, Result};
use crate::platform::GitDataService;
use crate::publish::commit::create_commit;
use crate::publish::context::resolve_repository_context;
use crate::publish::naming::{BranchNamer, derive_test_path};
use crate::publish::objects::{base_tree_of, create_blob, create_tree};
use crate::publish::refs::{BranchCleanup, create_ref, update_ref};
use crate::publish::request::{find_change_request, open_change_request};
use crate::publish::{CancelSignal, ProgressCallback, RemoteCaller};
use crate::types::{
    BranchProposal, ChangeRequest, PipelineStep, PublishJob, PublishOutcome, RepositoryContext,
};
use tracing::{debug, info, warn};

/// Attempts at creating a uniquely named branch
const BRANCH_NAME_ATTEMPTS: u32 = 2;

/// Publish pipeline bound to one repository service
pub struct Pipeline<'a> {
    service: &'a dyn GitDataService,
    config: &'a PipelineConfig,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over `service`
    pub const fn new(service: &'a dyn GitDataService, config: &'a PipelineConfig) -> Self {
        Self { service, config }
    }

    /// Run the pipeline for one job
    ///
    /// Runs are independent; one pipeline may drive several concurrently.
    /// Failures come back as [`Error::Pipeline`] naming the step that failed.
    pub async fn run(
        &self,
        job: &PublishJob,
        progress: &dyn ProgressCallback,
        cancel: &CancelSignal,
    ) -> Result<PublishOutcome> {
        let policy = self.config.retry_policy();
        let caller = RemoteCaller::new(&policy, cancel, progress);
        let mut cleanup = BranchCleanup::new();
        let mut target = PipelineStep::Init;

        match self
            .drive(job, &caller, progress, cancel, &mut cleanup, &mut target)
            .await
        {
            Ok(outcome) => {
                info!(
                    repo = %self.service.repo(),
                    branch = %outcome.branch,
                    url = %outcome.change_request_url,
                    "publish run complete"
                );
                Ok(outcome)
            }
            Err(err) => {
                let failure = PipelineFailure::at(target, &err);
                warn!(
                    repo = %self.service.repo(),
                    step = %failure.step,
                    kind = %failure.kind,
                    error = %err,
                    cleanup = cleanup.pending().unwrap_or("-"),
                    "publish run failed"
                );
                cleanup.run(self.service, &caller, progress).await;
                progress.on_step(PipelineStep::Failed).await;
                Err(failure.into())
            }
        }
    }

    /// The success path; `target` tracks the step being attempted
    async fn drive(
        &self,
        job: &PublishJob,
        caller: &RemoteCaller<'_>,
        progress: &dyn ProgressCallback,
        cancel: &CancelSignal,
        cleanup: &mut BranchCleanup,
        target: &mut PipelineStep,
    ) -> Result<PublishOutcome> {
        let service = self.service;

        let test_file_path = derive_test_path(&job.file_path, &self.config.test_suffix)?;
        if job.generated_content.is_empty() {
            warn!(path = %job.file_path, "publishing an empty test file");
        }
        reached(progress, target).await;

        checkpoint(cancel)?;
        let context = resolve_repository_context(service, caller).await?;
        reached(progress, target).await;

        checkpoint(cancel)?;
        let branch = self.create_branch(caller, &context, cleanup).await?;
        reached(progress, target).await;

        checkpoint(cancel)?;
        let blob = create_blob(service, caller, &job.generated_content).await?;
        reached(progress, target).await;

        checkpoint(cancel)?;
        let base_tree_sha = base_tree_of(service, caller, &context.head_commit_sha).await?;
        let tree = create_tree(service, caller, &base_tree_sha, &test_file_path, &blob.sha).await?;
        reached(progress, target).await;

        checkpoint(cancel)?;
        let message = self.config.commit_message_for(&job.file_path);
        let commit =
            create_commit(service, caller, &message, &tree.sha, &context.head_commit_sha).await?;
        reached(progress, target).await;

        checkpoint(cancel)?;
        update_ref(service, caller, &branch.name, &commit.sha).await?;
        reached(progress, target).await;

        // Committed: the branch now carries the test file, so cancellation no
        // longer applies. A failed pull request still removes the branch.
        let never = CancelSignal::never();
        let committed = caller.with_cancel(&never);
        let opened = open_change_request(
            service,
            &committed,
            &self.config.title_for(&job.file_path),
            &branch.name,
            &context.default_branch,
            &self.config.body,
        )
        .await;
        let request = match opened {
            Ok(request) => request,
            Err(Error::Conflict(msg)) => {
                self.adopt_change_request(&committed, progress, cleanup, &branch.name, msg)
                    .await?
            }
            Err(e) => return Err(e),
        };
        cleanup.disarm();
        reached(progress, target).await;

        Ok(PublishOutcome {
            change_request_url: request.url,
            branch: branch.name,
            test_file_path,
            commit_sha: commit.sha,
        })
    }

    /// Create the run branch, drawing a new name once if the first is taken
    ///
    /// Arms `cleanup` for the created branch, and also for a create whose
    /// outcome is unknown (cancelled, or out of transient retries).
    async fn create_branch(
        &self,
        caller: &RemoteCaller<'_>,
        context: &RepositoryContext,
        cleanup: &mut BranchCleanup,
    ) -> Result<BranchProposal> {
        let namer = BranchNamer::new(&self.config.branch_prefix);
        let mut attempt = 1;
        loop {
            let proposal = namer.propose(&context.head_commit_sha);
            match create_ref(self.service, caller, &proposal).await {
                Ok(()) => {
                    cleanup.arm(&proposal.name);
                    return Ok(proposal);
                }
                Err(Error::Conflict(msg)) if attempt < BRANCH_NAME_ATTEMPTS => {
                    debug!(
                        branch = %proposal.name,
                        reason = %msg,
                        "branch name taken, drawing another"
                    );
                    attempt += 1;
                }
                Err(e @ (Error::Cancelled | Error::Transient(_))) => {
                    debug!(
                        branch = %proposal.name,
                        error = %e,
                        "branch may exist, scheduling delete"
                    );
                    cleanup.arm(&proposal.name);
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve a `Conflict` from opening the pull request
    ///
    /// The run's branch is unique to the run, so an open request on it was
    /// opened by an earlier attempt whose response was lost. If the lookup
    /// itself fails the branch is kept, since deleting it would close any
    /// such request.
    async fn adopt_change_request(
        &self,
        caller: &RemoteCaller<'_>,
        progress: &dyn ProgressCallback,
        cleanup: &mut BranchCleanup,
        branch: &str,
        conflict: String,
    ) -> Result<ChangeRequest> {
        match find_change_request(self.service, caller, branch).await {
            Ok(Some(request)) => {
                info!(branch, url = %request.url, "pull request already open for run branch");
                progress
                    .on_message(&format!("Pull request #{} was already open", request.number))
                    .await;
                Ok(request)
            }
            Ok(None) => Err(Error::Conflict(conflict)),
            Err(e) => {
                warn!(branch, error = %e, "cannot look up pull request, keeping branch");
                cleanup.disarm();
                Err(Error::Conflict(conflict))
            }
        }
    }
}

/// Report the step just completed and move on to the next
async fn reached(progress: &dyn ProgressCallback, target: &mut PipelineStep) {
    progress.on_step(*target).await;
    if let Some(next) = target.next() {
        *target = next;
    }
}

fn checkpoint(cancel: &CancelSignal) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}
