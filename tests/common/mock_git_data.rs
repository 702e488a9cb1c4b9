//! In-memory Git-data service for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use testcase_pr::error::{Error, Result};
use testcase_pr::platform::GitDataService;
use testcase_pr::types::{ChangeRequest, RepoId, TreeEntry};

/// Initial commit on the default branch
pub const ROOT_COMMIT: &str = "commit-0";
/// Tree of the initial commit
pub const ROOT_TREE: &str = "tree-0";
/// File present in the initial tree
pub const EXISTING_FILE: &str = "src/util.js";
/// How long a call whose response is lost hangs after taking effect
pub const LOST_RESPONSE_HANG: Duration = Duration::from_secs(600);

/// Remote operations, for injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetDefaultBranch,
    GetBranchHead,
    GetCommitTree,
    CreateRef,
    CreateBlob,
    CreateTree,
    CreateCommit,
    UpdateRef,
    DeleteRef,
    CreatePullRequest,
    FindPullRequest,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StoredCommit {
    pub message: String,
    pub tree: String,
    pub parent: String,
}

#[derive(Default)]
struct Store {
    default_branch: String,
    refs: HashMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, StoredCommit>,
    pull_requests: Vec<ChangeRequest>,
    next_id: u64,
}

impl Store {
    fn id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}-{}", self.next_id)
    }
}

/// Mock Git-data service backed by an in-memory object store
///
/// Features:
/// - Refs, blobs, trees, commits and pull requests with Git-data semantics
///   (fast-forward-only ref updates, "already exists" conflicts)
/// - Call tracking for verification
/// - Error injection per operation (queued, consumed in order)
/// - Per-operation delays, for timeout tests under a paused clock
/// - Lost responses: a call takes effect, then hangs past any timeout
pub struct MockGitData {
    repo: RepoId,
    store: Mutex<Store>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, VecDeque<Error>>>,
    delays: Mutex<HashMap<Op, Duration>>,
    lost: Mutex<HashSet<Op>>,
}

impl MockGitData {
    /// `acme/widgets` with `main` at a root commit holding one file
    pub fn new() -> Self {
        let mut store = Store {
            default_branch: "main".to_string(),
            ..Store::default()
        };
        store.blobs.insert("blob-0".to_string(), b"module.exports = {};\n".to_vec());
        store.trees.insert(
            ROOT_TREE.to_string(),
            BTreeMap::from([(EXISTING_FILE.to_string(), "blob-0".to_string())]),
        );
        store.commits.insert(
            ROOT_COMMIT.to_string(),
            StoredCommit {
                message: "Initial commit".to_string(),
                tree: ROOT_TREE.to_string(),
                parent: String::new(),
            },
        );
        store.refs.insert("main".to_string(), ROOT_COMMIT.to_string());

        Self {
            repo: RepoId {
                owner: "acme".to_string(),
                name: "widgets".to_string(),
                host: None,
            },
            store: Mutex::new(store),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            lost: Mutex::new(HashSet::new()),
        }
    }

    // === Error injection methods ===

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: Op, error: Error) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Make the next `times` calls of `op` fail with `error`
    pub fn fail_times(&self, op: Op, times: usize, error: &Error) {
        for _ in 0..times {
            self.fail_next(op, error.clone());
        }
    }

    /// Delay every call of `op` before it takes effect
    pub fn delay(&self, op: Op, delay: Duration) {
        self.delays.lock().unwrap().insert(op, delay);
    }

    /// Let the next successful call of `op` take effect, then hang
    pub fn lose_next_response(&self, op: Op) {
        self.lost.lock().unwrap().insert(op);
    }

    /// Create a branch out of band
    pub fn put_ref(&self, branch: &str, sha: &str) {
        self.store
            .lock()
            .unwrap()
            .refs
            .insert(branch.to_string(), sha.to_string());
    }

    // === Call verification methods ===

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls of `op`
    pub fn count(&self, op: Op) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.op == op).count()
    }

    /// Branches other than the default branch
    pub fn branches(&self) -> Vec<String> {
        let store = self.store.lock().unwrap();
        let mut branches: Vec<String> = store
            .refs
            .keys()
            .filter(|b| **b != store.default_branch)
            .cloned()
            .collect();
        branches.sort();
        branches
    }

    /// Commit a branch points at
    pub fn head_of(&self, branch: &str) -> Option<String> {
        self.store.lock().unwrap().refs.get(branch).cloned()
    }

    /// Stored commit by SHA
    pub fn commit(&self, sha: &str) -> Option<StoredCommit> {
        self.store.lock().unwrap().commits.get(sha).cloned()
    }

    /// Bytes of `path` in the tree `branch` points at
    pub fn file_at(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let store = self.store.lock().unwrap();
        let commit = store.refs.get(branch)?;
        let tree = &store.commits.get(commit)?.tree;
        let blob = store.trees.get(tree)?.get(path)?;
        store.blobs.get(blob).cloned()
    }

    /// Paths in the tree `branch` points at
    pub fn paths_at(&self, branch: &str) -> Vec<String> {
        let store = self.store.lock().unwrap();
        store
            .refs
            .get(branch)
            .and_then(|c| store.commits.get(c))
            .and_then(|c| store.trees.get(&c.tree))
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Pull requests opened so far
    pub fn pull_requests(&self) -> Vec<ChangeRequest> {
        self.store.lock().unwrap().pull_requests.clone()
    }

    /// Assert that the branch was deleted exactly once
    pub fn assert_deleted_once(&self, branch: &str) {
        let deletes: Vec<Call> = self
            .calls()
            .into_iter()
            .filter(|c| c.op == Op::DeleteRef)
            .collect();
        assert_eq!(deletes.len(), 1, "Expected one delete_ref but got: {deletes:?}");
        assert_eq!(deletes[0].args, vec![branch.to_string()]);
    }

    async fn enter(&self, op: Op, args: &[&str]) -> Result<()> {
        self.calls.lock().unwrap().push(Call {
            op,
            args: args.iter().map(ToString::to_string).collect(),
        });

        let delay = self.delays.lock().unwrap().get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let injected = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        injected.map_or(Ok(()), Err)
    }

    async fn leave<T>(&self, op: Op, result: Result<T>) -> Result<T> {
        if result.is_ok() && self.lost.lock().unwrap().remove(&op) {
            tokio::time::sleep(LOST_RESPONSE_HANG).await;
        }
        result
    }
}

impl MockGitData {
    fn open_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<ChangeRequest> {
        let mut store = self.store.lock().unwrap();
        if !store.refs.contains_key(head) {
            return Err(Error::Validation(format!("head: invalid branch {head}")));
        }
        if store
            .pull_requests
            .iter()
            .any(|pr| pr.head_branch == head && pr.base_branch == base)
        {
            return Err(Error::Conflict(format!(
                "A pull request already exists for acme:{head}"
            )));
        }
        let number = store.pull_requests.len() as u64 + 1;
        let request = ChangeRequest {
            number,
            title: title.to_string(),
            head_branch: head.to_string(),
            base_branch: base.to_string(),
            body: body.to_string(),
            url: format!("https://github.com/{}/pull/{number}", self.repo.full_name()),
        };
        store.pull_requests.push(request.clone());
        Ok(request)
    }
}

impl Default for MockGitData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitDataService for MockGitData {
    async fn get_default_branch(&self) -> Result<String> {
        self.enter(Op::GetDefaultBranch, &[]).await?;
        Ok(self.store.lock().unwrap().default_branch.clone())
    }

    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        self.enter(Op::GetBranchHead, &[branch]).await?;
        self.head_of(branch)
            .ok_or_else(|| Error::NotFound(format!("Branch not found: {branch}")))
    }

    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String> {
        self.enter(Op::GetCommitTree, &[commit_sha]).await?;
        self.commit(commit_sha)
            .map(|c| c.tree)
            .ok_or_else(|| Error::NotFound(format!("No commit found for SHA: {commit_sha}")))
    }

    async fn create_ref(&self, branch: &str, sha: &str) -> Result<()> {
        self.enter(Op::CreateRef, &[branch, sha]).await?;
        let result = {
            let mut store = self.store.lock().unwrap();
            if store.refs.contains_key(branch) {
                Err(Error::Conflict("Reference already exists".to_string()))
            } else if !store.commits.contains_key(sha) {
                Err(Error::Validation("Object does not exist".to_string()))
            } else {
                store.refs.insert(branch.to_string(), sha.to_string());
                Ok(())
            }
        };
        self.leave(Op::CreateRef, result).await
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String> {
        let size = content.len().to_string();
        self.enter(Op::CreateBlob, &[&size]).await?;
        let mut store = self.store.lock().unwrap();
        let sha = store.id("blob");
        store.blobs.insert(sha.clone(), content.to_vec());
        Ok(sha)
    }

    async fn create_tree(&self, base_tree_sha: &str, entries: &[TreeEntry]) -> Result<String> {
        self.enter(Op::CreateTree, &[base_tree_sha]).await?;
        let mut store = self.store.lock().unwrap();
        let mut tree = store
            .trees
            .get(base_tree_sha)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("Invalid tree: {base_tree_sha}")))?;
        for entry in entries {
            if !store.blobs.contains_key(&entry.sha) {
                return Err(Error::Validation(format!("Invalid blob: {}", entry.sha)));
            }
            tree.insert(entry.path.clone(), entry.sha.clone());
        }
        let sha = store.id("tree");
        store.trees.insert(sha.clone(), tree);
        Ok(sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String> {
        self.enter(Op::CreateCommit, &[message, tree_sha, parent_sha])
            .await?;
        let mut store = self.store.lock().unwrap();
        if !store.trees.contains_key(tree_sha) || !store.commits.contains_key(parent_sha) {
            return Err(Error::Validation("Tree or parent SHA does not exist".to_string()));
        }
        let sha = store.id("commit");
        store.commits.insert(
            sha.clone(),
            StoredCommit {
                message: message.to_string(),
                tree: tree_sha.to_string(),
                parent: parent_sha.to_string(),
            },
        );
        Ok(sha)
    }

    async fn update_ref(&self, branch: &str, sha: &str) -> Result<()> {
        self.enter(Op::UpdateRef, &[branch, sha]).await?;
        let mut store = self.store.lock().unwrap();
        let current = store
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Reference does not exist: {branch}")))?;
        let parent = store.commits.get(sha).map(|c| c.parent.clone());
        if parent.as_deref() != Some(current.as_str()) {
            return Err(Error::Conflict("Update is not a fast forward".to_string()));
        }
        store.refs.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn delete_ref(&self, branch: &str) -> Result<()> {
        self.enter(Op::DeleteRef, &[branch]).await?;
        self.store
            .lock()
            .unwrap()
            .refs
            .remove(branch)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Reference does not exist: {branch}")))
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<ChangeRequest> {
        self.enter(Op::CreatePullRequest, &[title, head, base])
            .await?;
        let result = self.open_pull_request(title, head, base, body);
        self.leave(Op::CreatePullRequest, result).await
    }

    async fn find_open_pull_request(&self, head: &str) -> Result<Option<ChangeRequest>> {
        self.enter(Op::FindPullRequest, &[head]).await?;
        let store = self.store.lock().unwrap();
        let open = store.refs.contains_key(head);
        Ok(store
            .pull_requests
            .iter()
            .find(|pr| open && pr.head_branch == head)
            .cloned())
    }

    fn repo(&self) -> &RepoId {
        &self.repo
    }
}
