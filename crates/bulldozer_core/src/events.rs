//! Webhook notifications and their routing to affected pull requests.
//!
//! [`Notification::parse`] turns a raw webhook payload into the set of pull requests it
//! may affect. [`EventRouter`] resolves those pull requests with the installation's
//! client and runs each through the [`PullRequestProcessor`] on a detached task.

use github_client::models::PullRequest;
use github_client::{ClientProvider, PullRequestClient};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::BulldozerError;
use crate::processor::PullRequestProcessor;
use crate::pull_context::GitHubPullContext;

/// How the pull requests affected by a notification are found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Pull requests named by the payload
    Numbers(Vec<u64>),
    /// Open pull requests whose head commit is this SHA
    HeadSha(String),
    /// Open pull requests targeting this branch (short name)
    BaseBranch(String),
}

/// A webhook delivery reduced to what the engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event_type: String,
    pub installation_id: u64,
    pub owner: String,
    pub repo: String,
    pub target: Target,
}

#[derive(Debug, Deserialize)]
struct InstallationRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct OwnerRef {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    name: String,
    owner: OwnerRef,
}

/// Fields shared by every event this engine consumes.
#[derive(Debug, Deserialize)]
struct Common {
    installation: Option<InstallationRef>,
    repository: RepositoryRef,
}

#[derive(Debug, Deserialize)]
struct NumberRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    action: String,
    number: u64,
    #[serde(flatten)]
    common: Common,
}

#[derive(Debug, Deserialize)]
struct PullRequestReviewEvent {
    action: String,
    pull_request: NumberRef,
    #[serde(flatten)]
    common: Common,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IssueCommentEvent {
    action: String,
    issue: Issue,
    #[serde(flatten)]
    common: Common,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    #[serde(default)]
    pull_requests: Vec<NumberRef>,
}

#[derive(Debug, Deserialize)]
struct CheckRunEvent {
    action: String,
    check_run: CheckRun,
    #[serde(flatten)]
    common: Common,
}

#[derive(Debug, Deserialize)]
struct StatusEvent {
    state: String,
    sha: String,
    #[serde(flatten)]
    common: Common,
}

#[derive(Debug, Deserialize)]
struct PushEvent {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default)]
    deleted: bool,
    #[serde(flatten)]
    common: Common,
}

impl Notification {
    /// Parses a webhook payload.
    ///
    /// Returns `Ok(None)` for event types and actions that cannot change whether a pull
    /// request should be updated or merged.
    pub fn parse(event_type: &str, payload: &[u8]) -> Result<Option<Self>, BulldozerError> {
        let (common, target) = match event_type {
            "pull_request" => {
                let event: PullRequestEvent = decode(event_type, payload)?;
                if event.action == "closed" {
                    return Ok(None);
                }
                (event.common, Target::Numbers(vec![event.number]))
            }
            "pull_request_review" => {
                let event: PullRequestReviewEvent = decode(event_type, payload)?;
                if event.action != "submitted" {
                    return Ok(None);
                }
                (event.common, Target::Numbers(vec![event.pull_request.number]))
            }
            "issue_comment" => {
                let event: IssueCommentEvent = decode(event_type, payload)?;
                if event.action != "created" || event.issue.pull_request.is_none() {
                    return Ok(None);
                }
                (event.common, Target::Numbers(vec![event.issue.number]))
            }
            "check_run" => {
                let event: CheckRunEvent = decode(event_type, payload)?;
                if event.action != "completed" || event.check_run.pull_requests.is_empty() {
                    return Ok(None);
                }
                let numbers = event
                    .check_run
                    .pull_requests
                    .iter()
                    .map(|pr| pr.number)
                    .collect();
                (event.common, Target::Numbers(numbers))
            }
            "status" => {
                let event: StatusEvent = decode(event_type, payload)?;
                if event.state != "success" {
                    return Ok(None);
                }
                (event.common, Target::HeadSha(event.sha))
            }
            "push" => {
                let event: PushEvent = decode(event_type, payload)?;
                let Some(branch) = event.reference.strip_prefix("refs/heads/") else {
                    return Ok(None);
                };
                if event.deleted {
                    return Ok(None);
                }
                let branch = branch.to_string();
                (event.common, Target::BaseBranch(branch))
            }
            _ => return Ok(None),
        };

        let installation = common.installation.ok_or_else(|| BulldozerError::InvalidPayload {
            event_type: event_type.to_string(),
            reason: "missing installation".to_string(),
        })?;

        Ok(Some(Self {
            event_type: event_type.to_string(),
            installation_id: installation.id,
            owner: common.repository.owner.login,
            repo: common.repository.name,
            target,
        }))
    }
}

fn decode<T: DeserializeOwned>(event_type: &str, payload: &[u8]) -> Result<T, BulldozerError> {
    serde_json::from_slice(payload).map_err(|e| BulldozerError::InvalidPayload {
        event_type: event_type.to_string(),
        reason: e.to_string(),
    })
}

/// Counts of one notification's pull requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub processed: usize,
    pub failed: usize,
}

/// Routes notifications to the pipeline, at most `max_concurrent` at a time.
#[derive(Clone)]
pub struct EventRouter {
    provider: Arc<dyn ClientProvider>,
    processor: Arc<PullRequestProcessor>,
    limiter: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
}

/// Decrements the pending count when a submitted task ends, even when it is aborted.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EventRouter {
    pub fn new(
        provider: Arc<dyn ClientProvider>,
        processor: Arc<PullRequestProcessor>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            provider,
            processor,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of submitted notifications that are queued or still being processed.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Handles the notification on a detached task. Callers are not expected to wait
    /// for the returned handle.
    pub fn submit(&self, notification: Notification) -> JoinHandle<()> {
        let router = self.clone();
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(self.pending.clone());
        tokio::spawn(async move {
            let _guard = guard;
            let _permit = match router.limiter.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Event limiter closed, dropping notification");
                    return;
                }
            };

            match router.dispatch(&notification).await {
                Ok(report) => debug!(
                    event_type = %notification.event_type,
                    processed = report.processed,
                    failed = report.failed,
                    "Notification handled"
                ),
                Err(e) => warn!(
                    event_type = %notification.event_type,
                    installation_id = notification.installation_id,
                    error = %e,
                    "Failed to handle notification"
                ),
            }
        })
    }

    /// Processes every pull request affected by the notification. A failure on one pull
    /// request does not stop the others.
    #[instrument(
        skip(self, notification),
        fields(
            event_type = %notification.event_type,
            installation_id = notification.installation_id,
            owner = %notification.owner,
            repo = %notification.repo,
        )
    )]
    pub async fn dispatch(&self, notification: &Notification) -> Result<DispatchReport, BulldozerError> {
        let client = self
            .provider
            .installation_client(notification.installation_id)
            .await?;
        let owner = notification.owner.as_str();
        let repo = notification.repo.as_str();

        let mut report = DispatchReport::default();
        let pull_requests = match &notification.target {
            Target::Numbers(numbers) => {
                let mut found = Vec::with_capacity(numbers.len());
                for &number in numbers {
                    match client.get_pull_request(owner, repo, number).await {
                        Ok(pr) => found.push(pr),
                        Err(e) => {
                            warn!(pr_number = number, error = %e, "Failed to fetch pull request");
                            report.failed += 1;
                        }
                    }
                }
                found
            }
            Target::HeadSha(sha) => {
                list_open_pull_requests_for_sha(client.as_ref(), owner, repo, sha).await?
            }
            Target::BaseBranch(branch) => {
                list_open_pull_requests_for_base(client.as_ref(), owner, repo, branch).await?
            }
        };

        for pr in pull_requests {
            let number = pr.number;
            let base_ref = match &notification.target {
                Target::BaseBranch(branch) => branch.clone(),
                _ => pr.base.reference.clone(),
            };
            let ctx = GitHubPullContext::new(client.clone(), owner, repo, pr);
            match self.processor.process(client.clone(), &ctx, &base_ref).await {
                Ok(_) => report.processed += 1,
                Err(e) => {
                    warn!(pr_number = number, error = %e, "Failed to process pull request");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed,
            "Dispatched notification"
        );
        Ok(report)
    }
}

/// Open pull requests whose head commit is `sha`.
pub async fn list_open_pull_requests_for_sha(
    client: &dyn PullRequestClient,
    owner: &str,
    repo: &str,
    sha: &str,
) -> Result<Vec<PullRequest>, BulldozerError> {
    collect_open_pull_requests(client, owner, repo, |pr| pr.head.sha == sha).await
}

/// Open pull requests targeting the branch `base` (short name).
pub async fn list_open_pull_requests_for_base(
    client: &dyn PullRequestClient,
    owner: &str,
    repo: &str,
    base: &str,
) -> Result<Vec<PullRequest>, BulldozerError> {
    collect_open_pull_requests(client, owner, repo, |pr| pr.base.reference == base).await
}

/// Every open pull request of a repository.
pub async fn list_all_open_pull_requests(
    client: &dyn PullRequestClient,
    owner: &str,
    repo: &str,
) -> Result<Vec<PullRequest>, BulldozerError> {
    collect_open_pull_requests(client, owner, repo, |_| true).await
}

/// Walks all pages of open pull requests, keeping the first occurrence of each number.
async fn collect_open_pull_requests<F>(
    client: &dyn PullRequestClient,
    owner: &str,
    repo: &str,
    keep: F,
) -> Result<Vec<PullRequest>, BulldozerError>
where
    F: Fn(&PullRequest) -> bool,
{
    let mut seen = HashSet::new();
    let mut matching = Vec::new();
    let mut page = Some(1);

    while let Some(current) = page {
        let result = client.list_open_pull_requests(owner, repo, current).await?;
        for pr in result.items {
            if keep(&pr) && seen.insert(pr.number) {
                matching.push(pr);
            }
        }
        page = result.next_page;
    }

    Ok(matching)
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
