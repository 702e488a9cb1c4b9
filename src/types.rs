//! Core types for testcase-pr

use serde::{Deserialize, Serialize};
use std::fmt;

/// A GitHub repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Custom host (None for github.com)
    pub host: Option<String>,
}

impl RepoId {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{host}/{}/{}", self.owner, self.name),
            None => write!(f, "{}/{}", self.owner, self.name),
        }
    }
}

/// Snapshot of the target repository taken once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContext {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Default branch (e.g. "main")
    pub default_branch: String,
    /// Head commit of the default branch at run start
    pub head_commit_sha: String,
}

/// A branch this run intends to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProposal {
    /// Branch name, without `refs/heads/`
    pub name: String,
    /// Commit the branch is created at
    pub base_sha: String,
}

/// Transport encoding of blob content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobEncoding {
    /// Base64-encoded bytes
    #[serde(rename = "base64")]
    Base64,
}

/// A blob created on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Platform-assigned SHA (opaque)
    pub sha: String,
    /// Encoding used on the wire
    pub encoding: BlobEncoding,
    /// Content size in bytes
    pub size: usize,
}

/// Git file mode of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    /// Regular, non-executable file
    #[serde(rename = "100644")]
    File,
}

/// Git object type of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// File content
    Blob,
}

/// One entry of a tree, in Git-data API shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the repository root
    pub path: String,
    /// File mode
    pub mode: FileMode,
    /// Object type
    #[serde(rename = "type")]
    pub kind: ObjectType,
    /// Object SHA
    pub sha: String,
}

impl TreeEntry {
    /// A regular file entry pointing at a blob
    pub fn file(path: impl Into<String>, blob_sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FileMode::File,
            kind: ObjectType::Blob,
            sha: blob_sha.into(),
        }
    }
}

/// A tree created on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    /// Tree of the commit the branch points at
    pub base_tree_sha: String,
    /// Entries layered on top of the base tree
    pub entries: Vec<TreeEntry>,
    /// Platform-assigned SHA
    pub sha: String,
}

/// A commit created on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Commit message
    pub message: String,
    /// Tree the commit points at
    pub tree_sha: String,
    /// Single parent
    pub parent_sha: String,
    /// Platform-assigned SHA
    pub sha: String,
}

/// A pull request opened by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Head branch name
    pub head_branch: String,
    /// Base branch name
    pub base_branch: String,
    /// PR description
    pub body: String,
    /// Web URL for the PR
    pub url: String,
}

/// Pipeline invocation contract, as received from the HTTP layer
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Source file the tests were generated for
    pub file_path: String,
    /// Generated test file content
    pub generated_content: String,
    /// `owner/name`
    pub repository_full_name: String,
    /// OAuth or personal access token
    pub auth_token: String,
}

impl fmt::Debug for PublishRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishRequest")
            .field("file_path", &self.file_path)
            .field("generated_content", &format_args!("<{} bytes>", self.generated_content.len()))
            .field("repository_full_name", &self.repository_full_name)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// One unit of work for the pipeline, with credentials split off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishJob {
    /// Target repository
    pub repo: RepoId,
    /// Source file the tests were generated for
    pub file_path: String,
    /// Generated test file content
    pub generated_content: String,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    /// Web URL of the opened pull request
    pub change_request_url: String,
    /// Branch created by the run
    pub branch: String,
    /// Path of the test file in the tree
    pub test_file_path: String,
    /// Commit the branch points at
    pub commit_sha: String,
}

/// Pipeline states, in order
///
/// `Failed` is the terminal failure state, reachable from any non-terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Inputs validated, nothing fetched
    Init,
    /// Default branch and head SHA known
    RepoResolved,
    /// Run branch exists at the head SHA
    BranchCreated,
    /// Test content uploaded
    BlobCreated,
    /// Tree with the test file created
    TreeCreated,
    /// Commit created on top of the head SHA
    CommitCreated,
    /// Run branch points at the new commit
    RefUpdated,
    /// Pull request opened (terminal success)
    RequestOpened,
    /// Terminal failure
    Failed,
}

impl PipelineStep {
    /// The step after this one on the success path
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::RepoResolved),
            Self::RepoResolved => Some(Self::BranchCreated),
            Self::BranchCreated => Some(Self::BlobCreated),
            Self::BlobCreated => Some(Self::TreeCreated),
            Self::TreeCreated => Some(Self::CommitCreated),
            Self::CommitCreated => Some(Self::RefUpdated),
            Self::RefUpdated => Some(Self::RequestOpened),
            Self::RequestOpened | Self::Failed => None,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
