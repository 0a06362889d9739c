use super::errors::GitHubError;
use super::types::{Comment, CommentId, Issue, NewRelease, PullRequest, PullRequestQuery, Release};
use async_trait::async_trait;
use octocrab::models::repos::Object;
use octocrab::params::repos::Reference;
use octocrab::repos::releases::MakeLatest;
use octocrab::Octocrab;
use tracing::debug;

/// Trait for the GitHub REST calls the orchestrator makes, so the upsert,
/// release and workspace logic can run against fakes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Tip commit of `branch`, `None` when the branch does not exist.
    async fn get_branch_sha(&self, branch: &str) -> Result<Option<String>, GitHubError>;
    async fn list_pull_requests(&self, query: &PullRequestQuery) -> Result<Vec<PullRequest>, GitHubError>;
    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<PullRequest, GitHubError>;
    async fn get_issue(&self, number: u64) -> Result<Issue, GitHubError>;
    /// Works for pull requests too; GitHub treats them as issues.
    async fn update_issue_body(&self, number: u64, body: &str) -> Result<(), GitHubError>;
    async fn list_issue_comments(&self, number: u64, per_page: u8) -> Result<Vec<Comment>, GitHubError>;
    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<Comment, GitHubError>;
    async fn update_issue_comment(&self, comment_id: CommentId, body: &str) -> Result<Comment, GitHubError>;
    async fn create_release(&self, release: &NewRelease) -> Result<Release, GitHubError>;
    async fn set_release_latest(&self, release_id: u64) -> Result<(), GitHubError>;
    async fn delete_release(&self, release_id: u64) -> Result<(), GitHubError>;
    /// Deletes `refs/tags/<tag>`.
    async fn delete_tag_ref(&self, tag: &str) -> Result<(), GitHubError>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(token: &str, owner: &str, repo: &str) -> Result<Self, GitHubError> {
        if token.trim().is_empty() {
            return Err(GitHubError::TokenNotFound(
                "GitHub token is empty. Set the 'token' input or GITHUB_TOKEN.".to_string(),
            ));
        }

        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()?;

        Ok(Self::with_octocrab(octocrab, owner, repo))
    }

    /// Use a pre-built client, e.g. one pointed at a mock server.
    pub fn with_octocrab(octocrab: Octocrab, owner: &str, repo: &str) -> Self {
        Self {
            octocrab,
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }
}

fn make_latest(latest: bool) -> MakeLatest {
    if latest {
        MakeLatest::True
    } else {
        MakeLatest::False
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn get_branch_sha(&self, branch: &str) -> Result<Option<String>, GitHubError> {
        let found = self
            .octocrab
            .repos(&self.owner, &self.repo)
            .get_ref(&Reference::Branch(branch.to_string()))
            .await;

        let reference = match found {
            Ok(reference) => reference,
            Err(err) => {
                let err = GitHubError::from(err);
                return if err.is_not_found() { Ok(None) } else { Err(err) };
            }
        };

        match reference.object {
            Object::Commit { sha, .. } | Object::Tag { sha, .. } => Ok(Some(sha)),
            _ => Err(GitHubError::InvalidResponse(format!(
                "refs/heads/{branch} does not point at a commit"
            ))),
        }
    }

    async fn list_pull_requests(&self, query: &PullRequestQuery) -> Result<Vec<PullRequest>, GitHubError> {
        debug!(?query, "Listing pull requests");
        let pulls = self.octocrab.pulls(&self.owner, &self.repo);
        let mut list = pulls.list().state(query.state.into()).per_page(query.per_page);
        if let Some(head) = &query.head {
            list = list.head(head.as_str());
        }
        if let Some(base) = &query.base {
            list = list.base(base.as_str());
        }

        let page = list.send().await?;
        Ok(page.items)
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<PullRequest, GitHubError> {
        let pr = self
            .octocrab
            .pulls(&self.owner, &self.repo)
            .create(title, head, base)
            .body(body)
            .send()
            .await?;
        Ok(pr)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue, GitHubError> {
        let issue = self.octocrab.issues(&self.owner, &self.repo).get(number).await?;
        Ok(issue)
    }

    async fn update_issue_body(&self, number: u64, body: &str) -> Result<(), GitHubError> {
        self.octocrab
            .issues(&self.owner, &self.repo)
            .update(number)
            .body(body)
            .send()
            .await?;
        Ok(())
    }

    async fn list_issue_comments(&self, number: u64, per_page: u8) -> Result<Vec<Comment>, GitHubError> {
        let comments = self
            .octocrab
            .issues(&self.owner, &self.repo)
            .list_comments(number)
            .per_page(per_page)
            .send()
            .await?;
        Ok(comments.items)
    }

    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<Comment, GitHubError> {
        let comment = self
            .octocrab
            .issues(&self.owner, &self.repo)
            .create_comment(number, body)
            .await?;
        Ok(comment)
    }

    async fn update_issue_comment(&self, comment_id: CommentId, body: &str) -> Result<Comment, GitHubError> {
        let comment = self
            .octocrab
            .issues(&self.owner, &self.repo)
            .update_comment(comment_id, body)
            .await?;
        Ok(comment)
    }

    async fn create_release(&self, release: &NewRelease) -> Result<Release, GitHubError> {
        let created = self
            .octocrab
            .repos(&self.owner, &self.repo)
            .releases()
            .create(&release.tag_name)
            .name(&release.name)
            .body(&release.body)
            .target_commitish(&release.target_commitish)
            .make_latest(make_latest(release.make_latest))
            .send()
            .await?;
        Ok(created)
    }

    async fn set_release_latest(&self, release_id: u64) -> Result<(), GitHubError> {
        self.octocrab
            .repos(&self.owner, &self.repo)
            .releases()
            .update(release_id)
            .make_latest(MakeLatest::True)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_release(&self, release_id: u64) -> Result<(), GitHubError> {
        // releases().delete() does not look at the response status.
        let route = format!("/repos/{}/{}/releases/{release_id}", self.owner, self.repo);
        let response = self.octocrab._delete(route, None::<&()>).await?;
        octocrab::map_github_error(response).await?;
        Ok(())
    }

    async fn delete_tag_ref(&self, tag: &str) -> Result<(), GitHubError> {
        self.octocrab
            .repos(&self.owner, &self.repo)
            .delete_ref(&Reference::Tag(tag.to_string()))
            .await?;
        Ok(())
    }
}
