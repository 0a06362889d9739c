// Test doubles shared by the unit tests - no side effects

use crate::changepacks::{ChangeKind, ChangeLog, ChangepackResult};
use crate::context::{BotIdentity, RunContext};
use crate::external::command::{CommandError, CommandExecutor, CommandOutput};
use crate::github::types::{
    author_login, Comment, CommentId, Issue, NewRelease, PullRequest, PullRequestQuery, PullRequestState,
    Release,
};
use crate::github::{GitHubApi, GitHubError};
use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

pub const BOT: &str = "github-actions[bot]";

pub fn ok_output(stdout: &str) -> CommandOutput {
    CommandOutput {
        status_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed_output(status_code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        status_code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// Command executor that answers from a script keyed by the full command
/// line. Queued responses are consumed in order and the last one repeats;
/// unscripted commands succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, command: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(output);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let mut command = program.to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        self.executed.lock().unwrap().push(command.clone());

        let mut responses = self.responses.lock().unwrap();
        let output = match responses.get_mut(&command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => CommandOutput::default(),
        };
        Ok(output)
    }
}

/// A result with a pending version and one minor log entry.
pub fn pending_result(path: &str, next_version: &str) -> ChangepackResult {
    ChangepackResult {
        logs: vec![ChangeLog {
            kind: ChangeKind::Minor,
            note: format!("Update {path}"),
        }],
        current_version: Some("1.0.0".to_string()),
        next_version: Some(next_version.to_string()),
        name: None,
        path: path.to_string(),
        changed: true,
    }
}

/// `changepacks check` output for `(path, next_version)` pairs.
pub fn check_json(entries: &[(&str, Option<&str>)]) -> String {
    let map: Map<String, Value> = entries
        .iter()
        .map(|(path, next)| {
            let logs = match next {
                Some(_) => json!([{ "type": "Minor", "note": format!("Update {path}") }]),
                None => json!([]),
            };
            (
                path.to_string(),
                json!({
                    "logs": logs,
                    "currentVersion": "1.0.0",
                    "nextVersion": next,
                    "name": null,
                    "path": path,
                    "changed": next.is_some(),
                }),
            )
        })
        .collect();
    Value::Object(map).to_string()
}

pub fn config_json(base_branch: &str, latest_package: Option<&str>) -> String {
    json!({
        "ignore": [],
        "baseBranch": base_branch,
        "latestPackage": latest_package,
    })
    .to_string()
}

/// Push to `git_ref` in `octo/widgets`.
pub fn push_context(git_ref: &str) -> RunContext {
    RunContext {
        owner: "octo".to_string(),
        repo: "widgets".to_string(),
        git_ref: git_ref.to_string(),
        sha: "deadbeef".to_string(),
        event_name: "push".to_string(),
        pull_request_number: None,
        bot: BotIdentity::default(),
        correlation_id: "test-run".to_string(),
    }
}

const API: &str = "https://api.github.com/repos/octo/widgets";
const CREATED_AT: &str = "2024-01-01T00:00:00Z";

fn author_json(login: &str) -> Value {
    let url = "https://api.github.com/users/octo";
    json!({
        "login": login,
        "id": 1,
        "node_id": "MDQ6VXNlcjE=",
        "avatar_url": "https://avatars.githubusercontent.com/u/1",
        "gravatar_id": "",
        "url": url,
        "html_url": "https://github.com/octo",
        "followers_url": format!("{url}/followers"),
        "following_url": format!("{url}/following"),
        "gists_url": format!("{url}/gists"),
        "starred_url": format!("{url}/starred"),
        "subscriptions_url": format!("{url}/subscriptions"),
        "organizations_url": format!("{url}/orgs"),
        "repos_url": format!("{url}/repos"),
        "events_url": format!("{url}/events"),
        "received_events_url": format!("{url}/received_events"),
        "type": "User",
        "site_admin": false,
        "name": null,
        "patch_url": null,
    })
}

// octocrab models are non-exhaustive, so fixtures go through serde.
fn model<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("fixture matches the octocrab model")
}

pub fn issue(number: u64, title: &str, body: Option<&str>, author: &str) -> Issue {
    let url = format!("{API}/issues/{number}");
    model(json!({
        "id": number,
        "node_id": format!("I_{number}"),
        "url": url,
        "repository_url": API,
        "labels_url": format!("{url}/labels"),
        "comments_url": format!("{url}/comments"),
        "events_url": format!("{url}/events"),
        "html_url": format!("https://github.com/octo/widgets/issues/{number}"),
        "number": number,
        "state": "open",
        "state_reason": null,
        "title": title,
        "body": body,
        "user": author_json(author),
        "labels": [],
        "assignees": [],
        "author_association": "NONE",
        "locked": false,
        "comments": 0,
        "created_at": CREATED_AT,
        "updated_at": CREATED_AT,
    }))
}

pub fn comment(id: u64, author: &str, body: &str) -> Comment {
    model(json!({
        "id": id,
        "node_id": format!("IC_{id}"),
        "url": format!("{API}/issues/comments/{id}"),
        "html_url": format!("https://github.com/octo/widgets/issues#issuecomment-{id}"),
        "body": body,
        "author_association": "NONE",
        "user": author_json(author),
        "created_at": CREATED_AT,
    }))
}

/// Open pull request from `changepacks/main` into `main`.
pub fn pull_request(number: u64, title: &str, author: &str, body: Option<&str>) -> PullRequest {
    model(json!({
        "url": format!("{API}/pulls/{number}"),
        "id": number,
        "html_url": format!("https://github.com/octo/widgets/pull/{number}"),
        "number": number,
        "state": "open",
        "title": title,
        "user": author_json(author),
        "body": body,
        "head": { "label": "octo:changepacks/main", "ref": "changepacks/main", "sha": format!("head{number}") },
        "base": { "label": "octo:main", "ref": "main", "sha": "base000" },
        "merged_at": null,
        "merge_commit_sha": null,
    }))
}

/// Merged bot pull request; a larger `order` merged later.
pub fn merged_pull_request(number: u64, title: &str, merge_sha: &str, order: i64) -> PullRequest {
    let mut pr = pull_request(number, title, BOT, None);
    pr.merged_at = DateTime::from_timestamp(1_704_067_200 + order * 3_600, 0);
    pr.merge_commit_sha = Some(merge_sha.to_string());
    pr
}

pub fn release(id: u64, tag: &str) -> Release {
    model(json!({
        "url": format!("{API}/releases/{id}"),
        "html_url": format!("https://github.com/octo/widgets/releases/tag/{id}"),
        "assets_url": format!("{API}/releases/{id}/assets"),
        "upload_url": format!("https://uploads.github.com/repos/octo/widgets/releases/{id}/assets"),
        "tarball_url": null,
        "zipball_url": null,
        "id": id,
        "node_id": format!("RE_{id}"),
        "tag_name": tag,
        "target_commitish": "deadbeef",
        "name": tag,
        "body": null,
        "draft": false,
        "prerelease": false,
        "created_at": CREATED_AT,
        "published_at": CREATED_AT,
        "author": null,
        "assets": [],
    }))
}

#[derive(Debug, Default)]
struct FakeState {
    issues: BTreeMap<u64, Issue>,
    comments: BTreeMap<u64, Vec<Comment>>,
    pulls: Vec<(PullRequestState, PullRequest)>,
    branches: BTreeMap<String, String>,
    releases: Vec<Release>,
    next_id: u64,
    calls: Vec<String>,
    failures: Vec<String>,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

/// In-memory GitHub that remembers what was written to it
#[derive(Debug, Default)]
pub struct FakeGitHub {
    state: Mutex<FakeState>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&self, number: u64, title: &str, body: Option<&str>, author: &str) {
        self.state
            .lock()
            .unwrap()
            .issues
            .insert(number, issue(number, title, body, author));
    }

    pub fn add_comment(&self, number: u64, author: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.comments.entry(number).or_default().push(comment(id, author, body));
    }

    /// Merged pull requests are filed as closed, everything else as open.
    pub fn add_pull_request(&self, pr: PullRequest) {
        let state = if pr.merged_at.is_some() {
            PullRequestState::Closed
        } else {
            PullRequestState::Open
        };
        self.state.lock().unwrap().pulls.push((state, pr));
    }

    pub fn add_branch(&self, name: &str, sha: &str) {
        self.state
            .lock()
            .unwrap()
            .branches
            .insert(name.to_string(), sha.to_string());
    }

    /// Fail every call whose call string starts with `prefix`.
    pub fn fail_on(&self, prefix: &str) {
        self.state.lock().unwrap().failures.push(prefix.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn comments(&self, number: u64) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn release_id(&self, tag: &str) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .releases
            .iter()
            .find(|release| release.tag_name == tag)
            .map(|release| release.id.into_inner())
    }

    fn record(&self, call: String) -> Result<std::sync::MutexGuard<'_, FakeState>, GitHubError> {
        let mut state = self.state.lock().unwrap();
        if state.failures.iter().any(|prefix| call.starts_with(prefix.as_str())) {
            state.calls.push(call.clone());
            return Err(GitHubError::InvalidResponse(format!("injected failure: {call}")));
        }
        state.calls.push(call);
        Ok(state)
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_branch_sha(&self, branch: &str) -> Result<Option<String>, GitHubError> {
        let state = self.record(format!("get_branch_sha {branch}"))?;
        Ok(state.branches.get(branch).cloned())
    }

    async fn list_pull_requests(&self, query: &PullRequestQuery) -> Result<Vec<PullRequest>, GitHubError> {
        let state = self.record("list_pull_requests".to_string())?;
        let head = query
            .head
            .as_deref()
            .map(|head| head.split_once(':').map_or(head, |(_, branch)| branch));

        Ok(state
            .pulls
            .iter()
            .filter(|(pr_state, _)| *pr_state == query.state)
            .filter(|(_, pr)| head.map_or(true, |head| pr.head.ref_field == head))
            .filter(|(_, pr)| query.base.as_deref().map_or(true, |base| pr.base.ref_field == base))
            .take(usize::from(query.per_page))
            .map(|(_, pr)| pr.clone())
            .collect())
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<PullRequest, GitHubError> {
        let mut state = self.record(format!("create_pull_request {title} {head} -> {base}"))?;
        let number = state.next_id();
        let mut pr = pull_request(number, title, BOT, Some(body));
        pr.head.ref_field = head.to_string();
        pr.base.ref_field = base.to_string();
        state.pulls.push((PullRequestState::Open, pr.clone()));
        Ok(pr)
    }

    async fn get_issue(&self, number: u64) -> Result<Issue, GitHubError> {
        let state = self.record(format!("get_issue {number}"))?;
        if let Some(issue) = state.issues.get(&number) {
            return Ok(issue.clone());
        }
        state
            .pulls
            .iter()
            .find(|(_, pr)| pr.number == number)
            .map(|(_, pr)| {
                issue(
                    number,
                    pr.title.as_deref().unwrap_or_default(),
                    pr.body.as_deref(),
                    author_login(pr),
                )
            })
            .ok_or_else(|| GitHubError::InvalidResponse(format!("issue {number} not found")))
    }

    async fn update_issue_body(&self, number: u64, body: &str) -> Result<(), GitHubError> {
        let mut state = self.record(format!("update_issue_body {number}"))?;
        if let Some(issue) = state.issues.get_mut(&number) {
            issue.body = Some(body.to_string());
        }
        for (_, pr) in state.pulls.iter_mut().filter(|(_, pr)| pr.number == number) {
            pr.body = Some(body.to_string());
        }
        Ok(())
    }

    async fn list_issue_comments(&self, number: u64, per_page: u8) -> Result<Vec<Comment>, GitHubError> {
        let state = self.record(format!("list_issue_comments {number}"))?;
        Ok(state
            .comments
            .get(&number)
            .map(|comments| comments.iter().take(usize::from(per_page)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<Comment, GitHubError> {
        let mut state = self.record(format!("create_issue_comment {number}"))?;
        let created = comment(state.next_id(), BOT, body);
        state.comments.entry(number).or_default().push(created.clone());
        Ok(created)
    }

    async fn update_issue_comment(&self, comment_id: CommentId, body: &str) -> Result<Comment, GitHubError> {
        let mut state = self.record(format!("update_issue_comment {comment_id}"))?;
        state
            .comments
            .values_mut()
            .flat_map(|comments| comments.iter_mut())
            .find(|comment| comment.id == comment_id)
            .map(|comment| {
                comment.body = Some(body.to_string());
                comment.clone()
            })
            .ok_or_else(|| GitHubError::InvalidResponse(format!("comment {comment_id} not found")))
    }

    async fn create_release(&self, plan: &NewRelease) -> Result<Release, GitHubError> {
        let mut state = self.record(format!("create_release {}", plan.tag_name))?;
        let id = state.next_id();
        let created = release(id, &plan.tag_name);
        state.releases.push(created.clone());
        Ok(created)
    }

    async fn set_release_latest(&self, release_id: u64) -> Result<(), GitHubError> {
        self.record(format!("set_release_latest {release_id}"))?;
        Ok(())
    }

    async fn delete_release(&self, release_id: u64) -> Result<(), GitHubError> {
        let mut state = self.record(format!("delete_release {release_id}"))?;
        state.releases.retain(|release| *release.id != release_id);
        Ok(())
    }

    async fn delete_tag_ref(&self, tag: &str) -> Result<(), GitHubError> {
        self.record(format!("delete_tag_ref {tag}"))?;
        Ok(())
    }
}
