use crate::config::ActionConfig;
use crate::external::changepacks::ChangepacksCli;
use crate::external::command::ProcessCommandExecutor;
use anyhow::Result;
use std::sync::Arc;

pub mod preview;
pub mod run;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Process executor rooted at the configured working directory.
pub fn process_executor(config: &ActionConfig) -> Arc<ProcessCommandExecutor> {
    Arc::new(ProcessCommandExecutor::in_dir(&config.working_directory))
}

pub fn changepacks_cli(config: &ActionConfig, executor: Arc<ProcessCommandExecutor>) -> ChangepacksCli {
    ChangepacksCli::new(executor, config.changepacks_bin.clone())
}
