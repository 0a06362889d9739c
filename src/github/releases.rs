use super::client::GitHubApi;
use super::types::NewRelease;
use crate::changepacks::{release_notes, ChangepackResult, ChangepackResultMap};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A release that exists on GitHub after this run created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub release_id: u64,
    pub tag_name: String,
    pub make_latest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Tag for one artifact. Repositories with several artifacts qualify the
/// version with the artifact name and path.
pub fn release_tag(result: &ChangepackResult, next_version: &str, artifact_count: usize) -> String {
    if artifact_count > 1 {
        format!("{}({})@{}", result.display_name(), result.path, next_version)
    } else {
        next_version.to_string()
    }
}

/// One release request per artifact with a pending version, keyed by path.
///
/// `artifact_count` is the number of artifacts in the repository, not the
/// number being released.
pub fn plan_releases(
    results: &ChangepackResultMap,
    artifact_count: usize,
    latest_package: Option<&str>,
    sha: &str,
) -> BTreeMap<String, NewRelease> {
    results
        .iter()
        .filter_map(|(path, result)| {
            let next = result.next_version.as_deref()?;
            let tag = release_tag(result, next, artifact_count);
            let make_latest = match latest_package {
                Some(latest) => result.path == latest,
                None => artifact_count == 1,
            };
            Some((
                path.clone(),
                NewRelease {
                    name: tag.clone(),
                    tag_name: tag,
                    body: release_notes(result),
                    target_commitish: sha.to_string(),
                    make_latest,
                },
            ))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseBatch {
    pub created: BTreeMap<String, ReleaseInfo>,
    /// Path to error message for releases that could not be created.
    pub failed: BTreeMap<String, String>,
}

pub struct ReleasePublisher {
    api: Arc<dyn GitHubApi>,
}

impl ReleasePublisher {
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }

    /// Issue every creation call at once; one failure does not stop the others.
    pub async fn create_all(&self, plans: &BTreeMap<String, NewRelease>) -> ReleaseBatch {
        let calls = plans.iter().map(|(path, plan)| {
            let api = self.api.clone();
            async move { (path.clone(), plan, api.create_release(plan).await) }
        });

        let mut batch = ReleaseBatch::default();
        for (path, plan, result) in join_all(calls).await {
            match result {
                Ok(release) => {
                    info!(path = %path, tag = %release.tag_name, id = %release.id, "Created release");
                    batch.created.insert(
                        path,
                        ReleaseInfo {
                            release_id: release.id.into_inner(),
                            tag_name: release.tag_name,
                            make_latest: plan.make_latest,
                            html_url: Some(release.html_url.to_string()),
                        },
                    );
                }
                Err(e) => {
                    error!(path = %path, tag = %plan.tag_name, "Failed to create release: {}", e);
                    batch.failed.insert(path, e.to_string());
                }
            }
        }
        batch
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    pub rolled_back: Vec<String>,
    pub latest_reassigned_to: Option<String>,
    /// Cleanup calls that failed; logged, never fatal.
    pub errors: Vec<String>,
}

/// Undoes the releases of artifacts whose publish failed
pub struct RollbackCoordinator {
    api: Arc<dyn GitHubApi>,
}

impl RollbackCoordinator {
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }

    /// Delete the release and tag of every failed path, in path order, then
    /// hand the "latest" flag to the first survivor if it was taken away.
    pub async fn rollback(
        &self,
        created: &BTreeMap<String, ReleaseInfo>,
        failed: &BTreeSet<String>,
    ) -> RollbackReport {
        let mut report = RollbackReport::default();
        let mut latest_removed = false;

        for (path, info) in created.iter().filter(|(path, _)| failed.contains(*path)) {
            warn!(path = %path, tag = %info.tag_name, "Rolling back release");

            if let Err(e) = self.api.delete_release(info.release_id).await {
                error!(path = %path, id = info.release_id, "Failed to delete release: {}", e);
                report.errors.push(format!("delete release {}: {e}", info.tag_name));
            }
            if let Err(e) = self.api.delete_tag_ref(&info.tag_name).await {
                error!(path = %path, tag = %info.tag_name, "Failed to delete tag: {}", e);
                report.errors.push(format!("delete tag {}: {e}", info.tag_name));
            }

            latest_removed |= info.make_latest;
            report.rolled_back.push(path.clone());
        }

        if !latest_removed {
            return report;
        }

        let survivor = created
            .iter()
            .find(|(path, info)| !failed.contains(*path) && info.release_id != 0);

        if let Some((path, info)) = survivor {
            match self.api.set_release_latest(info.release_id).await {
                Ok(()) => {
                    info!(path = %path, tag = %info.tag_name, "Marked surviving release as latest");
                    report.latest_reassigned_to = Some(path.clone());
                }
                Err(e) => {
                    warn!(path = %path, tag = %info.tag_name, "Failed to mark release as latest: {}", e);
                    report.errors.push(format!("mark latest {}: {e}", info.tag_name));
                }
            }
        }

        report
    }
}
