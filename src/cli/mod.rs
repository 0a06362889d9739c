use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "changepacks-action")]
#[command(about = "Turn changepacks results into version pull requests, status comments and releases")]
#[command(long_about = "Runs inside a GitHub Actions job. On pushes it keeps the 'Update Versions' \
                       pull request in step with pending changelogs, and once that pull request is merged \
                       it creates the releases. On pull request events it only posts a status comment.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the release workflow for the current event (default)
    Run,
    /// Print the status body for the working tree without touching git or GitHub
    Preview {
        /// Print the raw check results as JSON instead of the rendered body
        #[arg(long, help = "Print the check results as JSON")]
        json: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
