//! Retroactive diff resolver
//!
//! Works out whether the push being processed merged an "Update Versions"
//! pull request and, if so, re-derives the released versions from the
//! changelog state just before that merge.

use super::workspace::{WorkspaceController, WorkspaceError};
use crate::changepacks::ChangepackResultMap;
use crate::external::changepacks::VersioningTool;
use crate::external::git::{GitError, GitRepository};
use crate::github::PullRequestHandler;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RetroactiveResolver<'a> {
    git: Arc<dyn GitRepository>,
    tool: Arc<dyn VersioningTool>,
    workspace: &'a WorkspaceController,
    pulls: &'a PullRequestHandler,
}

impl<'a> RetroactiveResolver<'a> {
    pub fn new(
        git: Arc<dyn GitRepository>,
        tool: Arc<dyn VersioningTool>,
        workspace: &'a WorkspaceController,
        pulls: &'a PullRequestHandler,
    ) -> Self {
        Self {
            git,
            tool,
            workspace,
            pulls,
        }
    }

    /// Revision to diff HEAD against.
    pub async fn reference_point(&self, base: &str) -> Result<String, WorkspaceError> {
        let head = match self.git.recent_commits(2).await {
            Ok(commits) => commits.into_iter().next(),
            Err(GitError::AncestorNotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        match self.pulls.last_merged_update(base).await {
            Ok(Some(pr)) => {
                let point = pr.merge_commit_sha.clone().unwrap_or_else(|| pr.head.sha.clone());
                debug!(number = pr.number, point = %point, "Found merged update pull request");
                if head.as_deref() == Some(point.as_str()) {
                    Ok(format!("{point}~1"))
                } else {
                    Ok(point)
                }
            }
            Ok(None) => Ok("HEAD~1".to_string()),
            Err(e) => {
                warn!("Could not look up merged update pull requests, comparing with HEAD~1: {}", e);
                Ok("HEAD~1".to_string())
            }
        }
    }

    /// Results with a pending version as of the reference point, or an empty
    /// map when the changelog directory did not change or history is missing.
    pub async fn resolve(&self, base: &str) -> Result<ChangepackResultMap, WorkspaceError> {
        let reference = self.reference_point(base).await?;
        let dir = self.workspace.changelog_dir();

        let changed = match self.git.diff_names(&reference, "HEAD", dir).await {
            Ok(files) => files,
            Err(GitError::AncestorNotFound { message }) => {
                info!(reference = %reference, "No comparable history ({}); nothing to release", message);
                return Ok(ChangepackResultMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        if changed.is_empty() {
            info!(reference = %reference, "Changelog directory unchanged; nothing to release");
            return Ok(ChangepackResultMap::new());
        }

        debug!(reference = %reference, files = ?changed, "Changelog directory changed");
        let tool = self.tool.clone();
        let results = self
            .workspace
            .with_changelog_at(&reference, || async move {
                tool.check().await.map_err(WorkspaceError::from)
            })
            .await?;

        Ok(results
            .into_iter()
            .filter(|(_, result)| result.is_pending())
            .collect())
    }
}
