//! Platform service factory

use crate::auth::AuthContext;
use crate::error::Result;
use crate::platform::{GitDataService, GitHubService};
use crate::types::RepoId;

/// Create the Git-data service for a repository
///
/// `default_host` applies when the repository spec did not name a host.
pub fn create_git_data_service(
    auth: &AuthContext,
    repo: &RepoId,
    default_host: Option<&str>,
) -> Result<Box<dyn GitDataService>> {
    let mut repo = repo.clone();
    if repo.host.is_none() {
        repo.host = default_host.map(ToString::to_string);
    }
    Ok(Box::new(GitHubService::new(auth, repo)?))
}
