use super::{changepacks_cli, process_executor, Command};
use crate::config::ActionConfig;
use crate::context::RunContext;
use crate::external::git::GitClient;
use crate::github::{ActionsOutput, GitHubClient};
use crate::notify::SlackNotifier;
use crate::telemetry::create_run_span;
use crate::workflows::{OrchestratorSettings, ReleaseOrchestrator, RunReport};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{info, Instrument};

pub struct RunCommand {
    config: ActionConfig,
    output: ActionsOutput,
}

impl RunCommand {
    pub fn new(config: ActionConfig) -> Self {
        Self {
            config,
            output: ActionsOutput::from_env(),
        }
    }

    pub fn with_output(mut self, output: ActionsOutput) -> Self {
        self.output = output;
        self
    }

    fn orchestrator(&self, ctx: RunContext) -> Result<ReleaseOrchestrator> {
        let token = self.config.require_token()?;
        let api = GitHubClient::new(token, &ctx.owner, &ctx.repo)?;
        let executor = process_executor(&self.config);
        let tool = changepacks_cli(&self.config, executor.clone());

        Ok(ReleaseOrchestrator::new(
            ctx,
            OrchestratorSettings {
                changelog_dir: self.config.changelog_dir.clone(),
                publish: self.config.publish,
                create_release: self.config.create_release,
            },
            Arc::new(tool),
            Arc::new(GitClient::new(executor)),
            Arc::new(api),
            Arc::new(SlackNotifier::new(self.config.slack_webhook_url.clone())),
        ))
    }

    /// Step outputs and annotations for a finished run. Per-artifact failures
    /// turn into an error after everything else has been reported.
    pub fn report(&self, report: &RunReport) -> Result<()> {
        for (path, result) in &report.results {
            if result.is_missing_logs() {
                self.output
                    .warning(&format!("{path} changed but has no changelog entry; did you forget to run changepacks?"));
            }
        }

        self.output
            .set_output("changepacks", &serde_json::to_string(&report.results)?)?;
        let tags: Vec<&str> = report.releases.iter().map(|r| r.tag_name.as_str()).collect();
        self.output.set_output("released", &serde_json::to_string(&tags)?)?;
        if let Some(number) = report.pull_request() {
            self.output.set_output("pull_request", &number.to_string())?;
        }

        for release in &report.releases {
            self.output.notice(&format!("Released {}", release.tag_name));
        }
        for failure in &report.failures {
            self.output
                .error(&format!("Release of {} failed: {}", failure.path, failure.message));
        }

        if report.is_success() {
            Ok(())
        } else {
            Err(anyhow!("{} artifact(s) failed to release", report.failures.len()))
        }
    }
}

impl Command for RunCommand {
    async fn execute(&self) -> Result<()> {
        let ctx = match RunContext::from_env() {
            Ok(ctx) => ctx,
            Err(e) => {
                self.output.error(&format!("Invalid workflow context: {e:#}"));
                return Err(e);
            }
        };

        let span = create_run_span(&ctx.repository(), &ctx.git_ref, &ctx.event_name, &ctx.correlation_id);
        let orchestrator = match self.orchestrator(ctx) {
            Ok(orchestrator) => orchestrator,
            Err(e) => {
                self.output.error(&format!("Invalid configuration: {e:#}"));
                return Err(e);
            }
        };

        let report = match orchestrator.run().instrument(span.clone()).await {
            Ok(report) => report,
            Err(e) => {
                self.output.error(&e.annotation());
                return Err(e.into());
            }
        };

        span.in_scope(|| info!(outcome = ?report.outcome, visited = ?report.visited, "Run finished"));
        self.report(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changepacks::ChangepackResultMap;
    use crate::github::ReleaseInfo;
    use crate::testing::pending_result;
    use crate::workflows::{ArtifactFailure, RunOutcome, RunState};
    use tempfile::TempDir;

    fn report(failures: Vec<ArtifactFailure>) -> RunReport {
        let mut missing = pending_result("pkg/b", "2.0.0");
        missing.logs.clear();
        RunReport {
            state: RunState::Done,
            visited: vec![RunState::Init, RunState::Done],
            outcome: RunOutcome::Released {
                tags: vec!["1.1.0".to_string()],
            },
            results: ChangepackResultMap::from([
                ("pkg/a".to_string(), pending_result("pkg/a", "1.1.0")),
                ("pkg/b".to_string(), missing),
            ]),
            releases: vec![ReleaseInfo {
                release_id: 7,
                tag_name: "1.1.0".to_string(),
                make_latest: true,
                html_url: None,
            }],
            failures,
        }
    }

    fn command(dir: &TempDir) -> RunCommand {
        RunCommand::new(ActionConfig::default())
            .with_output(ActionsOutput::new(Some(dir.path().join("output"))))
    }

    #[test]
    fn test_report_writes_outputs() {
        let dir = TempDir::new().unwrap();

        command(&dir).report(&report(vec![])).unwrap();

        let written = std::fs::read_to_string(dir.path().join("output")).unwrap();
        assert!(written.contains("changepacks<<ghadelimiter_"));
        assert!(written.contains(r#"["1.1.0"]"#));
        assert!(!written.contains("pull_request"));
    }

    #[test]
    fn test_failures_make_the_run_fail() {
        let dir = TempDir::new().unwrap();

        let error = command(&dir)
            .report(&report(vec![ArtifactFailure {
                path: "pkg/b".to_string(),
                message: "E403".to_string(),
            }]))
            .unwrap_err();

        assert_eq!(error.to_string(), "1 artifact(s) failed to release");
    }
}
