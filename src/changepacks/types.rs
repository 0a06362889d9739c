use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a single changelog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Major,
    Minor,
    Patch,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Major, ChangeKind::Minor, ChangeKind::Patch];
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Major => write!(f, "Major"),
            ChangeKind::Minor => write!(f, "Minor"),
            ChangeKind::Patch => write!(f, "Patch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ChangeKind,
    pub note: String,
}

/// Result reported by `changepacks` for one versioned artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangepackResult {
    #[serde(default)]
    pub logs: Vec<ChangeLog>,
    #[serde(default, alias = "version")]
    pub current_version: Option<String>,
    #[serde(default)]
    pub next_version: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    #[serde(default)]
    pub changed: bool,
}

impl ChangepackResult {
    /// A release is pending for this artifact.
    pub fn is_pending(&self) -> bool {
        self.next_version.is_some()
    }

    /// Version bumped (or files touched) without any recorded log entry.
    pub fn is_missing_logs(&self) -> bool {
        self.changed && self.logs.is_empty()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }

    pub fn logs_of(&self, kind: ChangeKind) -> impl Iterator<Item = &ChangeLog> {
        self.logs.iter().filter(move |log| log.kind == kind)
    }
}

/// Artifact path to result. Every tool invocation yields a fresh map.
pub type ChangepackResultMap = BTreeMap<String, ChangepackResult>;

pub fn has_pending_release(results: &ChangepackResultMap) -> bool {
    results.values().any(ChangepackResult::is_pending)
}

/// Repository-level settings reported by `changepacks config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangepacksConfig {
    #[serde(default)]
    pub ignore: Vec<String>,
    pub base_branch: String,
    #[serde(default)]
    pub latest_package: Option<String>,
}

/// Per-artifact outcome of `changepacks publish`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    #[serde(alias = "result")]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

pub type PublishResultMap = BTreeMap<String, PublishResult>;
