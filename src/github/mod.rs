pub mod actions;
pub mod client;
pub mod comments;
pub mod errors;
pub mod pulls;
pub mod releases;
pub mod types;

pub use actions::{ActionsOutput, Annotation};
pub use client::{GitHubApi, GitHubClient};
pub use comments::{CommentHandler, UpsertOutcome, UpsertTarget};
pub use errors::GitHubError;
pub use pulls::{update_branch, PullRequestHandler, UpdatePullRequest};
pub use releases::{plan_releases, ReleaseBatch, ReleaseInfo, ReleasePublisher, RollbackCoordinator, RollbackReport};
