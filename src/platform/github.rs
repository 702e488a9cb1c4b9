//! GitHub platform service implementation
//!
//! Talks to the Git-data endpoints directly with reqwest. Octocrab has no
//! typed coverage for blobs/trees/commits, and the request and response
//! shapes here must match the REST API exactly.

use crate::auth::AuthContext;
use crate::error::{Error, HttpFailure, Result};
use crate::platform::GitDataService;
use crate::types::{BlobEncoding, ChangeRequest, RepoId, TreeEntry};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_VERSION: &str = "2022-11-28";
const AGENT: &str = concat!("testcase-pr/", env!("CARGO_PKG_VERSION"));

/// GitHub service using reqwest
pub struct GitHubService {
    client: Client,
    token: String,
    api_base: String,
    repo: RepoId,
}

#[derive(Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaResponse,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaResponse,
}

#[derive(Deserialize)]
struct PullBranch {
    #[serde(rename = "ref")]
    ref_field: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    title: String,
    body: Option<String>,
    head: PullBranch,
    base: PullBranch,
}

impl From<PullResponse> for ChangeRequest {
    fn from(pr: PullResponse) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            head_branch: pr.head.ref_field,
            base_branch: pr.base.ref_field,
            body: pr.body.unwrap_or_default(),
            url: pr.html_url,
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct CreateRefPayload<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct UpdateRefPayload<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Serialize)]
struct CreateBlobPayload {
    content: String,
    encoding: BlobEncoding,
}

#[derive(Serialize)]
struct CreateTreePayload<'a> {
    base_tree: &'a str,
    tree: &'a [TreeEntry],
}

#[derive(Serialize)]
struct CreateCommitPayload<'a> {
    message: &'a str,
    tree: &'a str,
    parents: [&'a str; 1],
}

#[derive(Serialize)]
struct CreatePullPayload<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

impl GitHubService {
    /// Create a new GitHub service
    ///
    /// Uses `https://api.github.com`, or `https://<host>/api/v3` when the
    /// repository names an Enterprise host.
    pub fn new(auth: &AuthContext, repo: RepoId) -> Result<Self> {
        let api_base = repo.host.as_ref().map_or_else(
            || "https://api.github.com".to_string(),
            |h| format!("https://{h}/api/v3"),
        );
        Self::with_api_base(auth, repo, api_base)
    }

    /// Create a service against an explicit API base URL
    pub fn with_api_base(
        auth: &AuthContext,
        repo: RepoId,
        api_base: impl Into<String>,
    ) -> Result<Self> {
        // No client-wide timeout: each call is bounded by the pipeline's
        // configured per-call timeout instead.
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Internal(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: auth.token().to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base,
            urlencoding::encode(&self.repo.owner),
            urlencoding::encode(&self.repo.name),
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(USER_AGENT, AGENT)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(classify_response(response).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.send(request).await?.json().await?)
    }
}

/// Encode each segment of a branch name for use in a URL path
fn ref_path(branch: &str) -> String {
    branch
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn a non-success response into a classified error
async fn classify_response(response: Response) -> Error {
    let status = response.status().as_u16();
    let headers = response.headers();
    let retry_after_secs = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok());
    let quota_exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");

    let body = response.text().await.unwrap_or_default();

    HttpFailure {
        status,
        message: error_message(&body),
        retry_after_secs,
        quota_exhausted,
    }
    .classify()
}

/// Flatten GitHub's `{message, errors: [...]}` body into one line
fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
        return body.trim().chars().take(200).collect();
    };

    let mut parts: Vec<String> = parsed.message.into_iter().collect();
    for error in parsed.errors {
        let detail = match error {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string)
                .or_else(|| {
                    map.get("code")
                        .and_then(serde_json::Value::as_str)
                        .map(|code| format!("{code} error"))
                }),
            _ => None,
        };
        parts.extend(detail);
    }
    parts.join("; ")
}

#[async_trait]
impl GitDataService for GitHubService {
    async fn get_default_branch(&self) -> Result<String> {
        let url = self.repo_url("");
        debug!(url = %url, "fetching repository");
        let repo: RepoResponse = self.send_json(self.client.get(&url)).await?;
        Ok(repo.default_branch)
    }

    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        let url = self.repo_url(&format!("/git/ref/heads/{}", ref_path(branch)));
        debug!(url = %url, "fetching branch ref");
        let reference: RefResponse = self.send_json(self.client.get(&url)).await?;
        Ok(reference.object.sha)
    }

    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String> {
        let url = self.repo_url(&format!("/git/commits/{commit_sha}"));
        debug!(url = %url, "fetching commit");
        let commit: CommitResponse = self.send_json(self.client.get(&url)).await?;
        Ok(commit.tree.sha)
    }

    async fn create_ref(&self, branch: &str, sha: &str) -> Result<()> {
        let url = self.repo_url("/git/refs");
        let payload = CreateRefPayload {
            reference: format!("refs/heads/{branch}"),
            sha,
        };
        debug!(branch, sha, "creating ref");
        self.send(self.client.post(&url).json(&payload)).await?;
        Ok(())
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String> {
        let url = self.repo_url("/git/blobs");
        let payload = CreateBlobPayload {
            content: BASE64.encode(content),
            encoding: BlobEncoding::Base64,
        };
        debug!(bytes = content.len(), "creating blob");
        let blob: ShaResponse = self.send_json(self.client.post(&url).json(&payload)).await?;
        Ok(blob.sha)
    }

    async fn create_tree(&self, base_tree_sha: &str, entries: &[TreeEntry]) -> Result<String> {
        let url = self.repo_url("/git/trees");
        let payload = CreateTreePayload {
            base_tree: base_tree_sha,
            tree: entries,
        };
        debug!(base_tree_sha, entries = entries.len(), "creating tree");
        let tree: ShaResponse = self.send_json(self.client.post(&url).json(&payload)).await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String> {
        let url = self.repo_url("/git/commits");
        let payload = CreateCommitPayload {
            message,
            tree: tree_sha,
            parents: [parent_sha],
        };
        debug!(tree_sha, parent_sha, "creating commit");
        let commit: ShaResponse = self.send_json(self.client.post(&url).json(&payload)).await?;
        Ok(commit.sha)
    }

    async fn update_ref(&self, branch: &str, sha: &str) -> Result<()> {
        let url = self.repo_url(&format!("/git/refs/heads/{}", ref_path(branch)));
        let payload = UpdateRefPayload { sha, force: false };
        debug!(branch, sha, "updating ref");
        self.send(self.client.patch(&url).json(&payload)).await?;
        Ok(())
    }

    async fn delete_ref(&self, branch: &str) -> Result<()> {
        let url = self.repo_url(&format!("/git/refs/heads/{}", ref_path(branch)));
        debug!(branch, "deleting ref");
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<ChangeRequest> {
        let url = self.repo_url("/pulls");
        let payload = CreatePullPayload {
            title,
            head,
            base,
            body,
        };
        debug!(head, base, "creating pull request");
        let pr: PullResponse = self.send_json(self.client.post(&url).json(&payload)).await?;
        Ok(pr.into())
    }

    async fn find_open_pull_request(&self, head: &str) -> Result<Option<ChangeRequest>> {
        let url = self.repo_url("/pulls");
        let head = format!("{}:{head}", self.repo.owner);
        debug!(head = %head, "looking up open pull request");
        let prs: Vec<PullResponse> = self
            .send_json(
                self.client
                    .get(&url)
                    .query(&[("head", head.as_str()), ("state", "open")]),
            )
            .await?;
        Ok(prs.into_iter().next().map(Into::into))
    }

    fn repo(&self) -> &RepoId {
        &self.repo
    }
}
