//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands (git and the
//! changepacks binary), enabling dependency injection for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// Both streams concatenated, stdout first.
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }
}

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("IO error: {message}")]
    Io { message: String },
}

/// Trait for executing external commands
///
/// This abstraction allows the rest of the codebase to execute commands
/// without directly depending on tokio::process::Command, enabling testing
/// with scripted implementations.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

/// Real implementation that spawns the process and drains both pipes
/// concurrently, line by line, into accumulator buffers.
#[derive(Debug, Clone, Default)]
pub struct ProcessCommandExecutor {
    working_dir: Option<PathBuf>,
}

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
        }
    }
}

async fn drain<R>(reader: Option<R>, program: &str, stream: &'static str) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = String::new();
    let Some(reader) = reader else {
        return Ok(buffer);
    };

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        debug!(program, stream, "{}", line);
        buffer.push_str(&line);
        buffer.push('\n');
    }
    Ok(buffer)
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        debug!(program, args = ?args, "Spawning external command");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::CommandNotFound {
                    command: program.to_string(),
                }
            } else {
                CommandError::Io { message: e.to_string() }
            }
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout, stderr) = tokio::join!(
            drain(stdout, program, "stdout"),
            drain(stderr, program, "stderr")
        );

        let status = child
            .wait()
            .await
            .map_err(|e| CommandError::ExecutionFailed { message: e.to_string() })?;

        Ok(CommandOutput {
            status_code: status.code().unwrap_or(-1),
            stdout: stdout.map_err(|e| CommandError::Io { message: e.to_string() })?,
            stderr: stderr.map_err(|e| CommandError::Io { message: e.to_string() })?,
        })
    }
}
