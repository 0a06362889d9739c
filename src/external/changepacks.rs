//! `changepacks` CLI abstraction
//!
//! Wraps the versioning tool behind a trait so the orchestrator can be driven
//! by scripted output in tests. Every invocation yields freshly parsed values.

use super::command::{CommandError, CommandExecutor, CommandOutput};
use crate::changepacks::{ChangepackResultMap, ChangepacksConfig, PublishResultMap};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ChangepacksError {
    #[error("Command execution error: {source}")]
    CommandError {
        #[from]
        source: CommandError,
    },
    #[error("changepacks {subcommand} exited with status {status_code}: {output}")]
    Failed {
        subcommand: String,
        status_code: i32,
        output: String,
    },
    #[error("Could not parse changepacks {subcommand} output: {source}")]
    InvalidOutput {
        subcommand: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Trait for the versioning tool's sub-commands
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersioningTool: Send + Sync {
    /// `changepacks config`
    async fn config(&self) -> Result<ChangepacksConfig, ChangepacksError>;

    /// `changepacks check --format json`
    async fn check(&self) -> Result<ChangepackResultMap, ChangepacksError>;

    /// `changepacks update --format json --yes`
    async fn update(&self) -> Result<(), ChangepacksError>;

    /// `changepacks publish --format json --yes`
    async fn publish(&self) -> Result<PublishResultMap, ChangepacksError>;
}

/// Process-backed implementation
pub struct ChangepacksCli {
    executor: Arc<dyn CommandExecutor>,
    binary: String,
}

impl ChangepacksCli {
    pub fn new(executor: Arc<dyn CommandExecutor>, binary: impl Into<String>) -> Self {
        Self {
            executor,
            binary: binary.into(),
        }
    }

    async fn invoke(&self, args: &[&str]) -> Result<CommandOutput, ChangepacksError> {
        debug!(binary = %self.binary, args = ?args, "Invoking changepacks");
        Ok(self.executor.execute(&self.binary, args).await?)
    }

    fn failed(args: &[&str], output: &CommandOutput) -> ChangepacksError {
        ChangepacksError::Failed {
            subcommand: args.first().unwrap_or(&"").to_string(),
            status_code: output.status_code,
            output: output.combined().trim().to_string(),
        }
    }
}

/// Parse the combined buffer first; the tool may log to stderr, so stdout
/// alone is the fallback.
pub fn parse_output<T: DeserializeOwned>(subcommand: &str, output: &CommandOutput) -> Result<T, ChangepacksError> {
    match serde_json::from_str(output.combined().trim()) {
        Ok(value) => Ok(value),
        Err(combined_err) => serde_json::from_str(output.stdout.trim()).map_err(|_| {
            ChangepacksError::InvalidOutput {
                subcommand: subcommand.to_string(),
                source: combined_err,
            }
        }),
    }
}

#[async_trait]
impl VersioningTool for ChangepacksCli {
    async fn config(&self) -> Result<ChangepacksConfig, ChangepacksError> {
        let args = ["config"];
        let output = self.invoke(&args).await?;
        if !output.success() {
            return Err(Self::failed(&args, &output));
        }
        parse_output("config", &output)
    }

    async fn check(&self) -> Result<ChangepackResultMap, ChangepacksError> {
        let args = ["check", "--format", "json"];
        let output = self.invoke(&args).await?;
        if !output.success() {
            return Err(Self::failed(&args, &output));
        }
        parse_output("check", &output)
    }

    async fn update(&self) -> Result<(), ChangepacksError> {
        let args = ["update", "--format", "json", "--yes"];
        let output = self.invoke(&args).await?;
        if !output.success() {
            return Err(Self::failed(&args, &output));
        }
        Ok(())
    }

    async fn publish(&self) -> Result<PublishResultMap, ChangepacksError> {
        let args = ["publish", "--format", "json", "--yes"];
        let output = self.invoke(&args).await?;

        // A non-zero exit still carries per-artifact outcomes when some packages failed.
        match parse_output("publish", &output) {
            Ok(outcomes) => Ok(outcomes),
            Err(_) if !output.success() => Err(Self::failed(&args, &output)),
            Err(e) => Err(e),
        }
    }
}
