// changepacks-action library
// This exposes the core components for testing and integration

pub mod changepacks;
pub mod cli;
pub mod config;
pub mod context;
pub mod external;
pub mod git;
pub mod github;
pub mod notify;
pub mod observability;
pub mod telemetry;
pub mod workflows;

#[cfg(test)]
pub mod testing;

// Re-export key types for easy access
pub use changepacks::{render_body, ChangepackResult, ChangepackResultMap, ChangepacksConfig};
pub use config::{ActionConfig, LogFormat};
pub use context::{BotIdentity, RunContext};
pub use external::{ChangepacksCli, GitClient, ProcessCommandExecutor};
pub use github::{ActionsOutput, GitHubClient, GitHubError};
pub use notify::SlackNotifier;
pub use observability::OperationTimer;
pub use telemetry::{create_run_span, generate_correlation_id, init_telemetry};
pub use workflows::{decide, ReleaseOrchestrator, RunError, RunOutcome, RunReport, RunState};
