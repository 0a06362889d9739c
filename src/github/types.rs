//! Request shapes the orchestrator builds. Responses use octocrab's models.

pub use octocrab::models::issues::{Comment, Issue};
pub use octocrab::models::pulls::PullRequest;
pub use octocrab::models::repos::Release;
pub use octocrab::models::{Author, CommentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
}

impl From<PullRequestState> for octocrab::params::State {
    fn from(state: PullRequestState) -> Self {
        match state {
            PullRequestState::Open => octocrab::params::State::Open,
            PullRequestState::Closed => octocrab::params::State::Closed,
        }
    }
}

/// Filters for listing pull requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestQuery {
    pub state: PullRequestState,
    pub head: Option<String>,
    pub base: Option<String>,
    pub per_page: u8,
}

impl PullRequestQuery {
    pub fn open(head: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            state: PullRequestState::Open,
            head: Some(head.into()),
            base: Some(base.into()),
            per_page: 100,
        }
    }

    pub fn closed(base: impl Into<String>) -> Self {
        Self {
            state: PullRequestState::Closed,
            head: None,
            base: Some(base.into()),
            per_page: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub target_commitish: String,
    pub make_latest: bool,
}

/// Login of a pull request author, empty when GitHub omits the user.
pub fn author_login(pr: &PullRequest) -> &str {
    pr.user.as_deref().map(|user| user.login.as_str()).unwrap_or_default()
}
