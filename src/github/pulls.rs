use super::client::GitHubApi;
use super::comments::{CommentHandler, UpsertOutcome, UpsertTarget};
use super::errors::GitHubError;
use super::types::{PullRequest, PullRequestQuery};
use crate::changepacks::UPDATE_TITLE;
use std::sync::Arc;
use tracing::{debug, info};

/// Branch that carries the pending version bumps for `base`.
pub fn update_branch(base: &str) -> String {
    format!("changepacks/{base}")
}

/// Bookkeeping for the "Update Versions" pull request
pub struct PullRequestHandler {
    api: Arc<dyn GitHubApi>,
    owner: String,
    comments: CommentHandler,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePullRequest {
    Created(PullRequest),
    Refreshed(PullRequest, UpsertOutcome),
}

impl UpdatePullRequest {
    pub fn number(&self) -> u64 {
        match self {
            UpdatePullRequest::Created(pr) | UpdatePullRequest::Refreshed(pr, _) => pr.number,
        }
    }
}

impl PullRequestHandler {
    pub fn new(api: Arc<dyn GitHubApi>, owner: impl Into<String>, bot_login: impl Into<String>) -> Self {
        Self {
            comments: CommentHandler::new(api.clone(), bot_login),
            api,
            owner: owner.into(),
        }
    }

    /// Open pull request from `changepacks/<base>` into `base`, if any.
    pub async fn find_open_update(&self, base: &str) -> Result<Option<PullRequest>, GitHubError> {
        let head = format!("{}:{}", self.owner, update_branch(base));
        let pulls = self
            .api
            .list_pull_requests(&PullRequestQuery::open(head, base))
            .await?;
        Ok(pulls.into_iter().next())
    }

    /// Create the update pull request, or refresh the status body of the existing one.
    pub async fn ensure_update(&self, base: &str, body: &str) -> Result<UpdatePullRequest, GitHubError> {
        match self.find_open_update(base).await? {
            Some(pr) => {
                debug!(number = pr.number, "Found open update pull request");
                let outcome = self
                    .comments
                    .upsert(UpsertTarget::PullRequest(pr.clone()), body)
                    .await?;
                Ok(UpdatePullRequest::Refreshed(pr, outcome))
            }
            None => {
                let pr = self
                    .api
                    .create_pull_request(UPDATE_TITLE, &update_branch(base), base, body)
                    .await?;
                info!(
                    number = pr.number,
                    url = pr.html_url.as_ref().map(|url| url.as_str()).unwrap_or_default(),
                    "Created update pull request"
                );
                Ok(UpdatePullRequest::Created(pr))
            }
        }
    }

    /// Newest merged "Update Versions" pull request into `base`, scanning one
    /// page of closed pull requests.
    pub async fn last_merged_update(&self, base: &str) -> Result<Option<PullRequest>, GitHubError> {
        let pulls = self
            .api
            .list_pull_requests(&PullRequestQuery::closed(base))
            .await?;

        Ok(pulls
            .into_iter()
            .filter(|pr| pr.title.as_deref() == Some(UPDATE_TITLE) && pr.merged_at.is_some())
            .max_by_key(|pr| pr.merged_at))
    }
}
