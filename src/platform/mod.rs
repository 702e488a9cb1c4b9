//! Platform services for the remote Git-data API
//!
//! [`GitDataService`] is the boundary between the pipeline and the hosting
//! platform. Implementations classify every failure into the closed
//! [`ErrorKind`](crate::error::ErrorKind) taxonomy before returning it.

mod detection;
mod factory;
mod github;

pub use detection::parse_repo_spec;
pub use factory::create_git_data_service;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{ChangeRequest, RepoId, TreeEntry};
use async_trait::async_trait;

/// Git-data operations used by the publish pipeline
///
/// Each method is a single remote call scoped to one repository.
#[async_trait]
pub trait GitDataService: Send + Sync {
    /// Default branch name of the repository
    async fn get_default_branch(&self) -> Result<String>;

    /// Commit SHA a branch currently points at
    async fn get_branch_head(&self, branch: &str) -> Result<String>;

    /// Tree SHA of a commit
    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String>;

    /// Create `refs/heads/<branch>` at `sha`
    async fn create_ref(&self, branch: &str, sha: &str) -> Result<()>;

    /// Upload file content, returning the blob SHA
    async fn create_blob(&self, content: &[u8]) -> Result<String>;

    /// Create a tree from a base tree plus entries, returning the tree SHA
    async fn create_tree(&self, base_tree_sha: &str, entries: &[TreeEntry]) -> Result<String>;

    /// Create a single-parent commit, returning the commit SHA
    async fn create_commit(&self, message: &str, tree_sha: &str, parent_sha: &str)
    -> Result<String>;

    /// Fast-forward `refs/heads/<branch>` to `sha`
    async fn update_ref(&self, branch: &str, sha: &str) -> Result<()>;

    /// Delete `refs/heads/<branch>`
    async fn delete_ref(&self, branch: &str) -> Result<()>;

    /// Open a pull request from `head` into `base`
    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<ChangeRequest>;

    /// Open pull request whose head is `head`, if any
    async fn find_open_pull_request(&self, head: &str) -> Result<Option<ChangeRequest>>;

    /// Repository this service is bound to
    fn repo(&self) -> &RepoId;
}
