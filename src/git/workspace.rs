//! Git workspace controller
//!
//! Owns the working tree for a run: keeps `changepacks/<base>` in step with the
//! changelog state and offers a scoped checkout of the changelog directory.

use crate::context::BotIdentity;
use crate::external::changepacks::{ChangepacksError, VersioningTool};
use crate::external::git::{CheckoutOptions, GitError, GitRepository};
use crate::github::{update_branch, GitHubApi, GitHubError};
use crate::changepacks::UPDATE_TITLE;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const REMOTE: &str = "origin";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("git: {0}")]
    Git(#[from] GitError),
    #[error("changepacks: {0}")]
    Tool(#[from] ChangepacksError),
    #[error("{0}")]
    GitHub(#[from] GitHubError),
    #[error("Base branch '{0}' does not exist on GitHub")]
    BaseBranchNotFound(String),
}

pub struct WorkspaceController {
    git: Arc<dyn GitRepository>,
    api: Arc<dyn GitHubApi>,
    tool: Arc<dyn VersioningTool>,
    changelog_dir: String,
    bot: BotIdentity,
}

impl WorkspaceController {
    pub fn new(
        git: Arc<dyn GitRepository>,
        api: Arc<dyn GitHubApi>,
        tool: Arc<dyn VersioningTool>,
        changelog_dir: impl Into<String>,
        bot: BotIdentity,
    ) -> Self {
        Self {
            git,
            api,
            tool,
            changelog_dir: changelog_dir.into(),
            bot,
        }
    }

    pub fn changelog_dir(&self) -> &str {
        &self.changelog_dir
    }

    /// Fetch the base branch without touching the working tree.
    pub async fn sync_base(&self, base: &str) -> Result<(), WorkspaceError> {
        self.git.fetch(REMOTE, base).await?;
        Ok(())
    }

    async fn base_tip(&self, base: &str) -> Result<String, WorkspaceError> {
        self.api
            .get_branch_sha(base)
            .await?
            .ok_or_else(|| WorkspaceError::BaseBranchNotFound(base.to_string()))
    }

    /// Check out `changepacks/<base>`, creating it from the base tip when the
    /// remote has no such branch yet.
    pub async fn prepare_update_branch(&self, base: &str) -> Result<(), WorkspaceError> {
        let branch = update_branch(base);

        match self.git.fetch(REMOTE, &branch).await {
            Ok(()) => {
                self.git
                    .checkout_branch(
                        &branch,
                        Some("FETCH_HEAD"),
                        CheckoutOptions {
                            force: true,
                            create: true,
                            reset: true,
                        },
                    )
                    .await?;
                let tip = self.base_tip(base).await?;
                self.git.checkout_path(&tip, &self.changelog_dir).await?;
                info!(branch = %branch, base_tip = %tip, "Reset update branch onto remote state");
            }
            Err(GitError::RemoteRefNotFound { .. }) => {
                let tip = self.base_tip(base).await?;
                self.git
                    .checkout_branch(
                        &branch,
                        Some(&tip),
                        CheckoutOptions {
                            create: true,
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(branch = %branch, base_tip = %tip, "Created update branch");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    /// Apply pending bumps, then commit and push them. Returns whether a
    /// commit was pushed.
    ///
    /// Git runs `add`, `diff --cached --quiet`, the two identity `config`
    /// calls, `commit`, then `push`. The staged-change check sits between
    /// `add` and `config`; when nothing is staged the run stops there.
    pub async fn commit_and_push(&self, base: &str, pending: bool) -> Result<bool, WorkspaceError> {
        if !pending {
            info!("No pending versions; skipping commit");
            return Ok(false);
        }

        self.tool.update().await?;
        self.git.add(&self.changelog_dir).await?;

        if !self.git.has_staged_changes().await? {
            info!("Nothing staged; skipping commit");
            return Ok(false);
        }

        let branch = update_branch(base);
        self.git.set_config("user.name", &self.bot.name).await?;
        self.git.set_config("user.email", &self.bot.email).await?;
        self.git.commit(UPDATE_TITLE).await?;
        self.git.push(REMOTE, &branch).await?;
        info!(branch = %branch, "Pushed version updates");
        Ok(true)
    }

    /// Run `f` with the changelog directory checked out at `rev`. The
    /// directory is restored to HEAD afterwards whether or not `f` succeeded.
    pub async fn with_changelog_at<T, F, Fut>(&self, rev: &str, f: F) -> Result<T, WorkspaceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WorkspaceError>>,
    {
        self.git.checkout_path(rev, &self.changelog_dir).await?;

        let result = f().await;
        let restored = self.git.restore_path("HEAD", &self.changelog_dir).await;

        match (result, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(restore_err)) => Err(restore_err.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                warn!("Failed to restore {}: {}", self.changelog_dir, restore_err);
                Err(e)
            }
        }
    }
}
