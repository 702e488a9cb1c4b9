//! Pull request submission

use crate::error::Result;
use crate::platform::GitDataService;
use crate::publish::RemoteCaller;
use crate::types::{ChangeRequest, PipelineStep};
use tracing::{debug, info};

/// Open the pull request from `head` into `base`
///
/// An existing open request for the same head/base surfaces as `Conflict`.
pub async fn open_change_request(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    title: &str,
    head: &str,
    base: &str,
    body: &str,
) -> Result<ChangeRequest> {
    let request = caller
        .call(PipelineStep::RequestOpened, "create pull request", || {
            service.create_pull_request(title, head, base, body)
        })
        .await?;
    info!(number = request.number, url = %request.url, "pull request opened");
    Ok(request)
}

/// Look up the open pull request whose head is `head`
pub async fn find_change_request(
    service: &dyn GitDataService,
    caller: &RemoteCaller<'_>,
    head: &str,
) -> Result<Option<ChangeRequest>> {
    let found = caller
        .call(PipelineStep::RequestOpened, "find pull request", || {
            service.find_open_pull_request(head)
        })
        .await?;
    debug!(head, found = found.is_some(), "open pull request lookup");
    Ok(found)
}
