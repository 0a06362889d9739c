use anyhow::Result;
use changepacks_action::cli::commands::preview::PreviewCommand;
use changepacks_action::cli::commands::run::RunCommand;
use changepacks_action::cli::commands::Command;
use changepacks_action::cli::{Cli, Commands};
use changepacks_action::github::ActionsOutput;
use changepacks_action::{init_telemetry, ActionConfig};
use clap::Parser;

fn load_config() -> Result<(ActionConfig, bool)> {
    let env_file = ActionConfig::load_env_file()?;
    Ok((ActionConfig::load()?, env_file))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, env_file) = match load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            ActionsOutput::from_env().error(&format!("{e:#}"));
            return Err(e);
        }
    };
    init_telemetry(config.log_format)?;
    if env_file {
        tracing::info!("Loaded environment variables from .env file");
    }

    match cli.command() {
        Commands::Run => RunCommand::new(config).execute().await,
        Commands::Preview { json } => PreviewCommand::new(config).with_json(json).execute().await,
    }
}
