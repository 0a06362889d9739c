//! External tool abstractions
//!
//! Trait-based seams over the two processes the orchestrator shells out to:
//! git and the `changepacks` binary. Decision logic stays pure while the
//! effects go through a [`CommandExecutor`].

pub mod changepacks;
pub mod command;
pub mod git;

pub use changepacks::{ChangepacksCli, ChangepacksError, VersioningTool};
pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use git::{CheckoutOptions, GitClient, GitError, GitRepository};
