//! Git command abstractions
//!
//! Provides trait-based abstractions for the git operations the orchestrator
//! performs, enabling testable git integrations through dependency injection.

use super::command::{CommandError, CommandExecutor};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

pub type BranchName = String;
pub type CommitHash = String;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository not found or not a git repository")]
    RepositoryNotFound,
    /// The requested revision has no comparable ancestor (shallow clone,
    /// first commit, or a commit that was never fetched).
    #[error("No comparable ancestor for revision: {message}")]
    AncestorNotFound { message: String },
    #[error("Remote ref not found: {reference}")]
    RemoteRefNotFound { reference: String },
    #[error("Command execution error: {source}")]
    CommandError {
        #[from]
        source: CommandError,
    },
    #[error("Git command failed: {message}")]
    CommandFailed { message: String },
}

/// Fatal-message families git prints when a revision cannot be resolved.
fn missing_ancestor_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"bad revision",
            r"unknown revision",
            r"ambiguous argument",
            r"bad object",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

fn missing_remote_ref_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(?i)couldn't find remote ref", r"(?i)could not find remote ref"]
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Trait for git working-tree operations
///
/// This abstraction enables testing the workspace controller without an
/// actual repository, while preserving the exact command surface used in CI.
#[async_trait]
pub trait GitRepository: Send + Sync {
    /// `git fetch <remote> <branch>`
    async fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// `git log --format=%H -n <count>`
    async fn recent_commits(&self, count: usize) -> Result<Vec<CommitHash>, GitError>;

    /// `git diff <from> <to> --name-only -- <dir>`
    async fn diff_names(&self, from: &str, to: &str, dir: &str) -> Result<Vec<String>, GitError>;

    /// `git checkout [-f] <branch>`, or `-b`/`-B` when a start point is given.
    async fn checkout_branch(
        &self,
        branch: &BranchName,
        start_point: Option<&str>,
        options: CheckoutOptions,
    ) -> Result<(), GitError>;

    /// `git checkout <rev> -- <dir>`
    async fn checkout_path(&self, rev: &str, dir: &str) -> Result<(), GitError>;

    /// `git checkout --no-overlay <rev> -- <dir>`, which also removes files
    /// absent from `rev`.
    async fn restore_path(&self, rev: &str, dir: &str) -> Result<(), GitError>;

    /// `git add -- <dir>`
    async fn add(&self, dir: &str) -> Result<(), GitError>;

    /// `git diff --cached --quiet`; true when something is staged.
    async fn has_staged_changes(&self) -> Result<bool, GitError>;

    /// `git config <key> <value>`
    async fn set_config(&self, key: &str, value: &str) -> Result<(), GitError>;

    /// `git commit -m <message>`
    async fn commit(&self, message: &str) -> Result<(), GitError>;

    /// `git push <remote> <branch>`
    async fn push(&self, remote: &str, branch: &BranchName) -> Result<(), GitError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub force: bool,
    /// Create the branch; `reset` uses `-B` instead of `-b`.
    pub create: bool,
    pub reset: bool,
}

/// Real git implementation backed by a [`CommandExecutor`]
pub struct GitClient {
    executor: Arc<dyn CommandExecutor>,
}

impl GitClient {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    async fn execute_git_command(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.executor.execute("git", args).await?;

        if !output.success() {
            return Err(classify_git_error(&output.combined(), args));
        }

        Ok(output.stdout.trim().to_string())
    }
}

/// Map git's textual failure output onto an explicit error kind.
pub fn classify_git_error(output: &str, args: &[&str]) -> GitError {
    if output.contains("not a git repository") {
        GitError::RepositoryNotFound
    } else if missing_ancestor_patterns().iter().any(|p| p.is_match(output)) {
        GitError::AncestorNotFound {
            message: output.trim().to_string(),
        }
    } else if args.first() == Some(&"fetch")
        && missing_remote_ref_patterns().iter().any(|p| p.is_match(output))
    {
        GitError::RemoteRefNotFound {
            reference: args.last().unwrap_or(&"unknown").to_string(),
        }
    } else {
        GitError::CommandFailed {
            message: format!("git {}: {}", args.join(" "), output.trim()),
        }
    }
}

#[async_trait]
impl GitRepository for GitClient {
    async fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.execute_git_command(&["fetch", remote, branch]).await?;
        Ok(())
    }

    async fn recent_commits(&self, count: usize) -> Result<Vec<CommitHash>, GitError> {
        let count = count.to_string();
        let output = self
            .execute_git_command(&["log", "--format=%H", "-n", &count])
            .await?;
        Ok(output.lines().map(|line| line.trim().to_string()).collect())
    }

    async fn diff_names(&self, from: &str, to: &str, dir: &str) -> Result<Vec<String>, GitError> {
        let output = self
            .execute_git_command(&["diff", from, to, "--name-only", "--", dir])
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn checkout_branch(
        &self,
        branch: &BranchName,
        start_point: Option<&str>,
        options: CheckoutOptions,
    ) -> Result<(), GitError> {
        let mut args = vec!["checkout"];
        if options.force {
            args.push("-f");
        }
        if options.create {
            args.push(if options.reset { "-B" } else { "-b" });
        }
        args.push(branch);
        if let Some(start_point) = start_point {
            args.push(start_point);
        }
        self.execute_git_command(&args).await?;
        Ok(())
    }

    async fn checkout_path(&self, rev: &str, dir: &str) -> Result<(), GitError> {
        self.execute_git_command(&["checkout", rev, "--", dir]).await?;
        Ok(())
    }

    async fn restore_path(&self, rev: &str, dir: &str) -> Result<(), GitError> {
        self.execute_git_command(&["checkout", "--no-overlay", rev, "--", dir])
            .await?;
        Ok(())
    }

    async fn add(&self, dir: &str) -> Result<(), GitError> {
        self.execute_git_command(&["add", "--", dir]).await?;
        Ok(())
    }

    async fn has_staged_changes(&self) -> Result<bool, GitError> {
        // Exit status 1 means "differences found"; anything else is a real failure.
        let output = self
            .executor
            .execute("git", &["diff", "--cached", "--quiet"])
            .await?;
        match output.status_code {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(classify_git_error(
                &output.combined(),
                &["diff", "--cached", "--quiet"],
            )),
        }
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.execute_git_command(&["config", key, value]).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.execute_git_command(&["commit", "-m", message]).await?;
        Ok(())
    }

    async fn push(&self, remote: &str, branch: &BranchName) -> Result<(), GitError> {
        self.execute_git_command(&["push", remote, branch]).await?;
        Ok(())
    }
}
