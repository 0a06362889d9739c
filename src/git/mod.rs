//! Working-tree orchestration
//!
//! Higher-level git sequences built on the [`crate::external::git`] boundary.

pub mod retroactive;
pub mod workspace;

pub use retroactive::RetroactiveResolver;
pub use workspace::{WorkspaceController, WorkspaceError};
