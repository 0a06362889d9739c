// Release orchestration state machine
//
// Init -> ConfigLoaded -> BaseSynced -> Checked -> {CommentOnly | ForwardUpdate | BackwardRelease} -> Done

use crate::changepacks::{has_pending_release, render_body, ChangepackResultMap, ChangepacksConfig};
use crate::context::RunContext;
use crate::external::changepacks::{ChangepacksError, VersioningTool};
use crate::external::git::GitRepository;
use crate::git::{RetroactiveResolver, WorkspaceController, WorkspaceError};
use crate::github::{
    plan_releases, CommentHandler, GitHubApi, GitHubError, PullRequestHandler, ReleaseInfo, ReleasePublisher,
    RollbackCoordinator, UpsertTarget,
};
use crate::notify::ReleaseNotifier;
use crate::observability::OperationTimer;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Init,
    ConfigLoaded,
    BaseSynced,
    Checked,
    CommentOnly,
    ForwardUpdate,
    BackwardRelease,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Pick the branch taken after `Checked`. Pull request events only ever get a
/// status comment; otherwise any pending version means a forward update.
pub fn decide(is_pr_event: bool, results: &ChangepackResultMap) -> RunState {
    if is_pr_event {
        RunState::CommentOnly
    } else if has_pending_release(results) {
        RunState::ForwardUpdate
    } else {
        RunState::BackwardRelease
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to load changepacks config")]
    Config(#[source] ChangepacksError),
    #[error("Failed to fetch the base branch")]
    Git(#[source] WorkspaceError),
    #[error("changepacks check failed")]
    Tool(#[source] ChangepacksError),
    #[error("Pull request event without a pull request number")]
    MissingPullRequest,
    #[error("Failed to update the status comment")]
    Comment(#[source] GitHubError),
    #[error("Failed to prepare the version update branch")]
    Workspace(#[source] WorkspaceError),
    #[error("Failed to create or update the Update Versions pull request")]
    PullRequest(#[source] GitHubError),
    #[error("Failed to detect released versions")]
    Release(#[source] WorkspaceError),
}

impl RunError {
    /// `<message>: <cause>` for the failure annotation.
    pub fn annotation(&self) -> String {
        match std::error::Error::source(self) {
            Some(cause) => format!("{self}: {cause}"),
            None => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RunOutcome {
    Commented { number: u64 },
    UpdatePullRequest { number: u64, pushed: bool },
    Released { tags: Vec<String> },
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub visited: Vec<RunState>,
    pub outcome: RunOutcome,
    pub results: ChangepackResultMap,
    pub releases: Vec<ReleaseInfo>,
    pub failures: Vec<ArtifactFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn pull_request(&self) -> Option<u64> {
        match self.outcome {
            RunOutcome::UpdatePullRequest { number, .. } => Some(number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub changelog_dir: String,
    pub publish: bool,
    pub create_release: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            changelog_dir: ".changepacks".to_string(),
            publish: false,
            create_release: true,
        }
    }
}

struct PathOutcome {
    outcome: RunOutcome,
    releases: Vec<ReleaseInfo>,
    failures: Vec<ArtifactFailure>,
}

impl PathOutcome {
    fn plain(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            releases: Vec::new(),
            failures: Vec::new(),
        }
    }
}

pub struct ReleaseOrchestrator {
    ctx: RunContext,
    settings: OrchestratorSettings,
    tool: Arc<dyn VersioningTool>,
    git: Arc<dyn GitRepository>,
    api: Arc<dyn GitHubApi>,
    notifier: Arc<dyn ReleaseNotifier>,
}

impl ReleaseOrchestrator {
    pub fn new(
        ctx: RunContext,
        settings: OrchestratorSettings,
        tool: Arc<dyn VersioningTool>,
        git: Arc<dyn GitRepository>,
        api: Arc<dyn GitHubApi>,
        notifier: Arc<dyn ReleaseNotifier>,
    ) -> Self {
        Self {
            ctx,
            settings,
            tool,
            git,
            api,
            notifier,
        }
    }

    fn enter(visited: &mut Vec<RunState>, state: RunState) {
        info!(state = %state, "Entering state");
        visited.push(state);
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let mut visited = vec![RunState::Init];

        let config = OperationTimer::new("config")
            .record(self.tool.config().await)
            .map_err(RunError::Config)?;
        info!(
            base = %config.base_branch,
            ignore = ?config.ignore,
            latest = ?config.latest_package,
            "Loaded changepacks config"
        );
        Self::enter(&mut visited, RunState::ConfigLoaded);
        let base = config.base_branch.as_str();

        let workspace = WorkspaceController::new(
            self.git.clone(),
            self.api.clone(),
            self.tool.clone(),
            self.settings.changelog_dir.clone(),
            self.ctx.bot.clone(),
        );

        if !self.ctx.is_on_branch(base) {
            OperationTimer::new("sync_base")
                .record(workspace.sync_base(base).await)
                .map_err(RunError::Git)?;
        }
        Self::enter(&mut visited, RunState::BaseSynced);

        let results = OperationTimer::new("check")
            .record(self.tool.check().await)
            .map_err(RunError::Tool)?;
        Self::enter(&mut visited, RunState::Checked);

        for (path, result) in &results {
            if result.is_missing_logs() {
                warn!(path = %path, "Package changed without a changelog entry");
            }
        }

        let next = decide(self.ctx.is_pull_request_event(), &results);
        Self::enter(&mut visited, next);

        let path = match next {
            RunState::CommentOnly => self.comment_only(&results).await?,
            RunState::ForwardUpdate => self.forward_update(&workspace, base, &results).await?,
            _ => self.backward_release(&workspace, &config, results.len()).await?,
        };
        Self::enter(&mut visited, RunState::Done);

        Ok(RunReport {
            state: RunState::Done,
            visited,
            outcome: path.outcome,
            results,
            releases: path.releases,
            failures: path.failures,
        })
    }

    async fn comment_only(&self, results: &ChangepackResultMap) -> Result<PathOutcome, RunError> {
        let number = self.ctx.pull_request_number.ok_or(RunError::MissingPullRequest)?;
        let body = render_body(results);

        CommentHandler::new(self.api.clone(), self.ctx.bot.login.clone())
            .upsert(UpsertTarget::Issue(number), &body)
            .await
            .map_err(RunError::Comment)?;

        Ok(PathOutcome::plain(RunOutcome::Commented { number }))
    }

    async fn forward_update(
        &self,
        workspace: &WorkspaceController,
        base: &str,
        results: &ChangepackResultMap,
    ) -> Result<PathOutcome, RunError> {
        let timer = OperationTimer::new("forward_update");
        workspace
            .prepare_update_branch(base)
            .await
            .map_err(RunError::Workspace)?;
        let pushed = workspace
            .commit_and_push(base, has_pending_release(results))
            .await
            .map_err(RunError::Workspace)?;

        let pr = PullRequestHandler::new(self.api.clone(), self.ctx.owner.clone(), self.ctx.bot.login.clone())
            .ensure_update(base, &render_body(results))
            .await
            .map_err(RunError::PullRequest)?;
        timer.finish();

        Ok(PathOutcome::plain(RunOutcome::UpdatePullRequest {
            number: pr.number(),
            pushed,
        }))
    }

    async fn backward_release(
        &self,
        workspace: &WorkspaceController,
        config: &ChangepacksConfig,
        artifact_count: usize,
    ) -> Result<PathOutcome, RunError> {
        let pulls = PullRequestHandler::new(self.api.clone(), self.ctx.owner.clone(), self.ctx.bot.login.clone());
        let resolver = RetroactiveResolver::new(self.git.clone(), self.tool.clone(), workspace, &pulls);

        let released = OperationTimer::new("retroactive_diff")
            .record(resolver.resolve(&config.base_branch).await)
            .map_err(RunError::Release)?;

        if released.is_empty() {
            info!("Nothing was released by this push");
            return Ok(PathOutcome::plain(RunOutcome::NoOp));
        }

        let mut failures = Vec::new();
        let mut created = BTreeMap::new();

        if self.settings.create_release {
            let plans = plan_releases(
                &released,
                artifact_count,
                config.latest_package.as_deref(),
                &self.ctx.sha,
            );
            let batch = ReleasePublisher::new(self.api.clone()).create_all(&plans).await;
            failures.extend(
                batch
                    .failed
                    .into_iter()
                    .map(|(path, message)| ArtifactFailure { path, message }),
            );
            created = batch.created;
        }

        if self.settings.publish {
            let failed = self.publish(&created, &mut failures).await;
            if !failed.is_empty() {
                let report = RollbackCoordinator::new(self.api.clone())
                    .rollback(&created, &failed)
                    .await;
                for path in &report.rolled_back {
                    created.remove(path);
                }
            }
        }

        let releases: Vec<ReleaseInfo> = created.into_values().collect();
        if let Err(e) = self.notifier.notify(&self.ctx.repository(), &releases).await {
            warn!("Failed to send release notice: {}", e);
        }

        Ok(PathOutcome {
            outcome: RunOutcome::Released {
                tags: releases.iter().map(|r| r.tag_name.clone()).collect(),
            },
            releases,
            failures,
        })
    }

    /// Run `changepacks publish` and return the paths whose releases must be
    /// rolled back.
    async fn publish(
        &self,
        created: &BTreeMap<String, ReleaseInfo>,
        failures: &mut Vec<ArtifactFailure>,
    ) -> BTreeSet<String> {
        match OperationTimer::new("publish").record(self.tool.publish().await) {
            Ok(outcomes) => {
                // An artifact whose release could not be created is reported once.
                let reported: BTreeSet<String> = failures.iter().map(|f| f.path.clone()).collect();
                outcomes
                    .into_iter()
                    .filter(|(_, outcome)| !outcome.ok)
                    .map(|(path, outcome)| {
                        if !reported.contains(&path) {
                            failures.push(ArtifactFailure {
                                path: path.clone(),
                                message: outcome.error.unwrap_or_else(|| "publish failed".to_string()),
                            });
                        }
                        path
                    })
                    .collect()
            }
            Err(e) => {
                if created.is_empty() {
                    failures.push(ArtifactFailure {
                        path: "changepacks publish".to_string(),
                        message: e.to_string(),
                    });
                }
                for path in created.keys() {
                    failures.push(ArtifactFailure {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
                created.keys().cloned().collect()
            }
        }
    }
}
