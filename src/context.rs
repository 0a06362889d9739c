//! Run context
//!
//! Everything the workflow environment tells us about the current run,
//! captured once at startup and handed to each component.

use crate::telemetry::generate_correlation_id;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

pub const BOT_LOGIN: &str = "github-actions[bot]";
pub const BOT_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub login: String,
    pub name: String,
    pub email: String,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            login: BOT_LOGIN.to_string(),
            name: BOT_LOGIN.to_string(),
            email: BOT_EMAIL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
    pub sha: String,
    pub event_name: String,
    pub pull_request_number: Option<u64>,
    pub bot: BotIdentity,
    pub correlation_id: String,
}

impl RunContext {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|value| !value.is_empty()))
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let repository = lookup("GITHUB_REPOSITORY").ok_or_else(|| anyhow!("GITHUB_REPOSITORY is not set"))?;
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
            .ok_or_else(|| anyhow!("GITHUB_REPOSITORY must look like owner/repo, got '{repository}'"))?;

        let git_ref = lookup("GITHUB_REF").unwrap_or_default();
        let sha = lookup("GITHUB_SHA").ok_or_else(|| anyhow!("GITHUB_SHA is not set"))?;
        let event_name = lookup("GITHUB_EVENT_NAME").unwrap_or_default();

        let from_event = match lookup("GITHUB_EVENT_PATH") {
            Some(path) => read_event_pull_request_number(Path::new(&path))?,
            None => None,
        };
        let pull_request_number = from_event.or_else(|| pull_request_number_from_ref(&git_ref));

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref,
            sha,
            event_name,
            pull_request_number,
            bot: BotIdentity::default(),
            correlation_id: generate_correlation_id(),
        })
    }

    pub fn is_pull_request_event(&self) -> bool {
        matches!(self.event_name.as_str(), "pull_request" | "pull_request_target")
    }

    /// True when the run is on `refs/heads/<branch>`.
    pub fn is_on_branch(&self, branch: &str) -> bool {
        self.git_ref == format!("refs/heads/{branch}")
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn read_event_pull_request_number(path: &Path) -> Result<Option<u64>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event payload {}", path.display()))?;
    let event: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Event payload {} is not valid JSON", path.display()))?;

    Ok(event
        .pointer("/pull_request/number")
        .and_then(serde_json::Value::as_u64))
}

/// `refs/pull/<n>/merge` or `refs/pull/<n>/head`
fn pull_request_number_from_ref(git_ref: &str) -> Option<u64> {
    git_ref
        .strip_prefix("refs/pull/")?
        .split('/')
        .next()?
        .parse()
        .ok()
}
