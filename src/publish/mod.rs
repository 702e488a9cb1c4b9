//! Publish pipeline
//!
//! Turns one generated test file into an open pull request:
//! 1. Planning - resolve the repository and derive names and paths
//! 2. Execution - branch, blob, tree, commit, ref update, pull request
//!
//! Every remote call runs through the shared retry policy in [`retry`], and
//! a run that fails after creating its branch deletes that branch again.

mod cancel;
mod commit;
mod context;
mod execute;
mod naming;
mod objects;
mod plan;
mod progress;
mod refs;
mod request;
mod retry;

pub use cancel::{CancelHandle, CancelSignal};
pub use commit::create_commit;
pub use context::resolve_repository_context;
pub use execute::Pipeline;
pub use naming::{
    BranchNamer, SUFFIX_LEN, branch_name, collision_probability, derive_test_path, random_suffix,
    validate_repo_path,
};
pub use objects::{base_tree_of, create_blob, create_tree};
pub use plan::{PublishPlan, plan_publish};
pub use progress::{CleanupStatus, NoopProgress, ProgressCallback};
pub use refs::{BranchCleanup, create_ref, update_ref};
pub use request::{find_change_request, open_change_request};
pub use retry::{RemoteCaller, RetryPolicy};

use crate::auth::AuthContext;
use crate::config::PipelineConfig;
use crate::error::{PipelineFailure, Result};
use crate::platform::{create_git_data_service, parse_repo_spec};
use crate::types::{PipelineStep, PublishJob, PublishOutcome, PublishRequest};

impl PublishRequest {
    /// Split into the job and the credential it carries
    ///
    /// A malformed repository name fails at `Init` with `Validation`.
    pub fn into_parts(self) -> Result<(PublishJob, AuthContext)> {
        let repo = parse_repo_spec(&self.repository_full_name)
            .map_err(|e| PipelineFailure::at(PipelineStep::Init, &e))?;
        let auth = AuthContext::from_token(self.auth_token);
        Ok((
            PublishJob {
                repo,
                file_path: self.file_path,
                generated_content: self.generated_content,
            },
            auth,
        ))
    }
}

/// Publish one job against GitHub using an explicit credential
pub async fn publish(
    job: &PublishJob,
    auth: &AuthContext,
    config: &PipelineConfig,
    progress: &dyn ProgressCallback,
    cancel: &CancelSignal,
) -> Result<PublishOutcome> {
    let service = create_git_data_service(auth, &job.repo, config.api_host.as_deref())
        .map_err(|e| PipelineFailure::at(PipelineStep::Init, &e))?;
    Pipeline::new(service.as_ref(), config)
        .run(job, progress, cancel)
        .await
}

/// Publish a request as received from the HTTP layer
pub async fn publish_request(
    request: PublishRequest,
    config: &PipelineConfig,
    progress: &dyn ProgressCallback,
    cancel: &CancelSignal,
) -> Result<PublishOutcome> {
    let (job, auth) = request.into_parts()?;
    publish(&job, &auth, config, progress, cancel).await
}
