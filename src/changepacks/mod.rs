//! Domain values produced by the versioning tool and the markdown rendered
//! from them.

pub mod body;
pub mod types;

pub use body::{release_notes, render_artifact, render_body, MARKER, UPDATE_TITLE};
pub use types::{
    has_pending_release, ChangeKind, ChangeLog, ChangepackResult, ChangepackResultMap,
    ChangepacksConfig, PublishResult, PublishResultMap,
};
