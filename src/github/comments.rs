use super::client::GitHubApi;
use super::errors::GitHubError;
use super::types::{author_login, CommentId, PullRequest};
use crate::changepacks::{MARKER, UPDATE_TITLE};
use std::sync::Arc;
use tracing::{info, warn};

/// Comments are scanned one page deep.
pub const COMMENT_PAGE_SIZE: u8 = 100;

/// Where the status body should live
#[derive(Debug, Clone)]
pub enum UpsertTarget {
    /// Issue or pull request number; the resource is fetched first.
    Issue(u64),
    /// An already fetched pull request.
    PullRequest(PullRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    UpdatedBody(u64),
    UpdatedComment(CommentId),
    CreatedComment(CommentId),
}

/// Keeps exactly one canonical status surface per thread: either the bot's own
/// "Update Versions" body or a single marker comment.
pub struct CommentHandler {
    api: Arc<dyn GitHubApi>,
    bot_login: String,
}

struct Resource {
    number: u64,
    title: String,
    body: Option<String>,
    author: String,
}

impl CommentHandler {
    pub fn new(api: Arc<dyn GitHubApi>, bot_login: impl Into<String>) -> Self {
        Self {
            api,
            bot_login: bot_login.into(),
        }
    }

    fn is_canonical(&self, author: &str, body: Option<&str>) -> bool {
        author == self.bot_login && body.is_some_and(|body| body.starts_with(MARKER))
    }

    pub async fn upsert(&self, target: UpsertTarget, body: &str) -> Result<UpsertOutcome, GitHubError> {
        let resource = match target {
            UpsertTarget::Issue(number) => {
                let issue = self.api.get_issue(number).await?;
                Resource {
                    number: issue.number,
                    title: issue.title,
                    body: issue.body,
                    author: issue.user.login,
                }
            }
            UpsertTarget::PullRequest(pr) => Resource {
                number: pr.number,
                author: author_login(&pr).to_string(),
                title: pr.title.unwrap_or_default(),
                body: pr.body,
            },
        };

        if resource.title == UPDATE_TITLE && self.is_canonical(&resource.author, resource.body.as_deref()) {
            self.api.update_issue_body(resource.number, body).await?;
            info!(number = resource.number, "Updated status body");
            return Ok(UpsertOutcome::UpdatedBody(resource.number));
        }

        let comments = self
            .api
            .list_issue_comments(resource.number, COMMENT_PAGE_SIZE)
            .await?;

        let existing = comments
            .iter()
            .find(|comment| self.is_canonical(&comment.user.login, comment.body.as_deref()));

        match existing {
            Some(comment) => {
                let updated = self.api.update_issue_comment(comment.id, body).await?;
                info!(number = resource.number, comment_id = %updated.id, "Updated status comment");
                Ok(UpsertOutcome::UpdatedComment(updated.id))
            }
            None => {
                if comments.len() >= usize::from(COMMENT_PAGE_SIZE) {
                    warn!(
                        number = resource.number,
                        "Status comment not found in the first {} comments; a duplicate may be created",
                        COMMENT_PAGE_SIZE
                    );
                }
                let created = self.api.create_issue_comment(resource.number, body).await?;
                info!(number = resource.number, comment_id = %created.id, "Created status comment");
                Ok(UpsertOutcome::CreatedComment(created.id))
            }
        }
    }
}
