//! Blob and tree creation

use crate::error::{Error, Result};
use crate::platform::GitDataService;
use crate::publish::RemoteCaller;
use crate::publish::naming::validate_repo_path;
use crate::types::{Blob, BlobEncoding, PipelineStep, Tree, TreeEntry};
use tracing::debug;

/// Upload the test file content verbatim
///
/// Content goes over the wire base64-encoded so every byte survives.
pub async fn create_blob(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    content: &str,
) -> Result<Blob> {
    let bytes = content.as_bytes();
    let sha = caller
        .call(PipelineStep::BlobCreated, "create blob", || {
            service.create_blob(bytes)
        })
        .await?;

    debug!(sha = %sha, size = bytes.len(), "blob created");
    Ok(Blob {
        sha,
        encoding: BlobEncoding::Base64,
        size: bytes.len(),
    })
}

/// Look up the tree of the commit the branch currently points at
pub async fn base_tree_of(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    commit_sha: &str,
) -> Result<String> {
    caller
        .call(PipelineStep::TreeCreated, "get commit", || {
            service.get_commit_tree(commit_sha)
        })
        .await
}

/// Create a tree placing one blob at `path` on top of `base_tree_sha`
pub async fn create_tree(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    base_tree_sha: &str,
    path: &str,
    blob_sha: &str,
) -> Result<Tree> {
    if base_tree_sha.is_empty() {
        return Err(Error::Validation("base tree SHA is empty".to_string()));
    }
    validate_repo_path(path)?;

    let entries = vec![TreeEntry::file(path, blob_sha)];
    let sha = caller
        .call(PipelineStep::TreeCreated, "create tree", || {
            service.create_tree(base_tree_sha, &entries)
        })
        .await?;

    debug!(sha = %sha, base_tree_sha, path, "tree created");
    Ok(Tree {
        base_tree_sha: base_tree_sha.to_string(),
        entries,
        sha,
    })
}
