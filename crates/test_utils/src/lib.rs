//! Test utilities shared by the bulldozer crates.
//!
//! This crate provides in-memory implementations of the `github_client` traits so the
//! policy engine can be exercised without a GitHub server:
//!
//! - [`MockPullRequestClient`]: canned responses, per-operation failure injection,
//!   paginated listings and a record of every call made.
//! - [`MockClientProvider`]: a fixed set of installations, each mapped to a mock client.
//! - [`fixtures`]: builders for pull requests, status checks and repositories.

use async_trait::async_trait;
use github_client::models::{
    BranchMergeOutcome, Comment, Commit, Comparison, Label, MergeRequest, MergeResult,
    PullRequest, Repository, ResultPage, Review, StatusCheck,
};
use github_client::{ClientProvider, Error, Installation, PullRequestClient};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub mod fixtures;

/// A failure the mock should return instead of its canned response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    NotFound,
    Api(String),
    Conflict(String),
    RateLimit,
}

impl MockFailure {
    fn to_error(&self) -> Error {
        match self {
            MockFailure::NotFound => Error::NotFound,
            MockFailure::Api(message) => Error::ApiError(message.clone()),
            MockFailure::Conflict(message) => Error::Conflict(message.clone()),
            MockFailure::RateLimit => Error::RateLimitExceeded,
        }
    }
}

/// One call made against a mock client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Trait method name, e.g. `compare_commits`
    pub operation: String,
    /// Human readable arguments, e.g. `main...abc123`
    pub detail: String,
}

#[derive(Debug)]
struct InjectedFailure {
    failure: MockFailure,
    remaining: Option<usize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`PullRequestClient`].
///
/// Pull requests registered several times for the same number are returned in order, one
/// per `get_pull_request` call; the last one keeps being returned afterwards. The same
/// applies to comparisons.
#[derive(Debug, Default)]
pub struct MockPullRequestClient {
    pull_requests: Mutex<HashMap<u64, VecDeque<PullRequest>>>,
    open_pull_request_pages: HashMap<String, Vec<Vec<PullRequest>>>,
    labels: HashMap<u64, Vec<Label>>,
    comments: HashMap<u64, Vec<Comment>>,
    reviews: HashMap<u64, Vec<Review>>,
    commits: HashMap<u64, Vec<Commit>>,
    status_checks: HashMap<String, Vec<StatusCheck>>,
    comparisons: Mutex<VecDeque<Comparison>>,
    branch_merge_outcome: Option<BranchMergeOutcome>,
    merge_result: Option<MergeResult>,
    restricted_branches: HashSet<String>,
    files: HashMap<String, String>,
    repository_pages: Vec<Vec<Repository>>,
    failures: Mutex<HashMap<String, InjectedFailure>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockPullRequestClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pull request snapshot. Repeated calls queue further snapshots.
    pub fn with_pull_request(self, pr: PullRequest) -> Self {
        lock(&self.pull_requests)
            .entry(pr.number)
            .or_default()
            .push_back(pr);
        self
    }

    /// Registers the pages returned by `list_open_pull_requests` for `owner/repo`.
    pub fn with_open_pull_request_pages(
        mut self,
        owner: &str,
        repo: &str,
        pages: Vec<Vec<PullRequest>>,
    ) -> Self {
        self.open_pull_request_pages
            .insert(format!("{owner}/{repo}"), pages);
        self
    }

    pub fn with_labels(mut self, number: u64, labels: &[&str]) -> Self {
        self.labels.insert(
            number,
            labels
                .iter()
                .map(|name| Label {
                    name: name.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn with_comments(mut self, number: u64, bodies: &[&str]) -> Self {
        self.comments.insert(
            number,
            bodies
                .iter()
                .enumerate()
                .map(|(id, body)| Comment {
                    id: id as u64 + 1,
                    body: Some(body.to_string()),
                })
                .collect(),
        );
        self
    }

    pub fn with_reviews(mut self, number: u64, reviews: Vec<Review>) -> Self {
        self.reviews.insert(number, reviews);
        self
    }

    /// Registers the commits of a pull request; each entry is a full commit message.
    pub fn with_commits(mut self, number: u64, messages: &[&str]) -> Self {
        self.commits.insert(
            number,
            messages
                .iter()
                .enumerate()
                .map(|(i, message)| Commit {
                    sha: format!("commit-{i}"),
                    message: message.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn with_status_checks(mut self, reference: &str, checks: Vec<StatusCheck>) -> Self {
        self.status_checks.insert(reference.to_string(), checks);
        self
    }

    /// Queues a comparison result. Repeated calls queue further results.
    pub fn with_comparison(self, ahead_by: u64, behind_by: u64) -> Self {
        lock(&self.comparisons).push_back(Comparison {
            ahead_by,
            behind_by,
        });
        self
    }

    pub fn with_branch_merge_outcome(mut self, outcome: BranchMergeOutcome) -> Self {
        self.branch_merge_outcome = Some(outcome);
        self
    }

    pub fn with_merge_result(mut self, result: MergeResult) -> Self {
        self.merge_result = Some(result);
        self
    }

    pub fn with_push_restrictions(mut self, branch: &str) -> Self {
        self.restricted_branches.insert(branch.to_string());
        self
    }

    /// Registers a file readable at `reference`.
    pub fn with_file(mut self, path: &str, reference: &str, content: &str) -> Self {
        self.files
            .insert(format!("{path}@{reference}"), content.to_string());
        self
    }

    pub fn with_repository_pages(mut self, pages: Vec<Vec<Repository>>) -> Self {
        self.repository_pages = pages;
        self
    }

    /// Makes every call to `operation` fail.
    pub fn with_failure(self, operation: &str, failure: MockFailure) -> Self {
        self.inject(operation, failure, None);
        self
    }

    /// Makes the next `times` calls to `operation` fail.
    pub fn with_failure_times(self, operation: &str, failure: MockFailure, times: usize) -> Self {
        self.inject(operation, failure, Some(times));
        self
    }

    fn inject(&self, operation: &str, failure: MockFailure, remaining: Option<usize>) {
        lock(&self.failures).insert(
            operation.to_string(),
            InjectedFailure { failure, remaining },
        );
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Returns how many times `operation` was called.
    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Records the call and returns the injected failure for it, if any.
    fn enter(&self, operation: &str, detail: String) -> Result<(), Error> {
        lock(&self.calls).push(RecordedCall {
            operation: operation.to_string(),
            detail,
        });

        let mut failures = lock(&self.failures);
        let Some(injected) = failures.get_mut(operation) else {
            return Ok(());
        };

        let error = injected.failure.to_error();
        match injected.remaining.as_mut() {
            None => Err(error),
            Some(0) => Ok(()),
            Some(n) => {
                *n -= 1;
                Err(error)
            }
        }
    }
}

#[async_trait]
impl PullRequestClient for MockPullRequestClient {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, Error> {
        self.enter("get_pull_request", format!("{owner}/{repo}#{number}"))?;

        let mut prs = lock(&self.pull_requests);
        let queue = prs.get_mut(&number).ok_or(Error::NotFound)?;
        if queue.len() > 1 {
            queue.pop_front().ok_or(Error::NotFound)
        } else {
            queue.front().cloned().ok_or(Error::NotFound)
        }
    }

    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<ResultPage<PullRequest>, Error> {
        self.enter("list_open_pull_requests", format!("{owner}/{repo} page {page}"))?;

        let pages = self
            .open_pull_request_pages
            .get(&format!("{owner}/{repo}"))
            .cloned()
            .unwrap_or_default();
        Ok(page_of(pages, page))
    }

    async fn list_labels(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Label>, Error> {
        self.enter("list_labels", format!("{owner}/{repo}#{number}"))?;
        Ok(self.labels.get(&number).cloned().unwrap_or_default())
    }

    async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Comment>, Error> {
        self.enter("list_issue_comments", format!("{owner}/{repo}#{number}"))?;
        Ok(self.comments.get(&number).cloned().unwrap_or_default())
    }

    async fn list_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Review>, Error> {
        self.enter("list_reviews", format!("{owner}/{repo}#{number}"))?;
        Ok(self.reviews.get(&number).cloned().unwrap_or_default())
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Commit>, Error> {
        self.enter("list_commits", format!("{owner}/{repo}#{number}"))?;
        Ok(self.commits.get(&number).cloned().unwrap_or_default())
    }

    async fn list_status_checks(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<Vec<StatusCheck>, Error> {
        self.enter("list_status_checks", format!("{owner}/{repo}@{reference}"))?;
        Ok(self.status_checks.get(reference).cloned().unwrap_or_default())
    }

    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison, Error> {
        self.enter("compare_commits", format!("{owner}/{repo} {base}...{head}"))?;

        let mut comparisons = lock(&self.comparisons);
        let next = if comparisons.len() > 1 {
            comparisons.pop_front()
        } else {
            comparisons.front().copied()
        };
        Ok(next.unwrap_or(Comparison {
            ahead_by: 0,
            behind_by: 0,
        }))
    }

    async fn merge_branch(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<BranchMergeOutcome, Error> {
        self.enter("merge_branch", format!("{owner}/{repo} {head} into {base}"))?;
        Ok(self
            .branch_merge_outcome
            .clone()
            .unwrap_or(BranchMergeOutcome::Merged {
                sha: "update-sha".to_string(),
            }))
    }

    async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &MergeRequest,
    ) -> Result<MergeResult, Error> {
        self.enter(
            "merge_pull_request",
            format!(
                "{owner}/{repo}#{number} method={} title={:?} message={:?} sha={:?}",
                request.merge_method, request.commit_title, request.commit_message, request.sha
            ),
        )?;
        Ok(self.merge_result.clone().unwrap_or(MergeResult {
            merged: true,
            sha: Some("merge-sha".to_string()),
            message: Some("Pull Request successfully merged".to_string()),
        }))
    }

    async fn delete_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<(), Error> {
        self.enter("delete_branch", format!("{owner}/{repo} {branch}"))
    }

    async fn has_push_restrictions(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<bool, Error> {
        self.enter("has_push_restrictions", format!("{owner}/{repo} {branch}"))?;
        Ok(self.restricted_branches.contains(branch))
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Option<String>, Error> {
        match self.enter("get_file_content", format!("{owner}/{repo} {path}@{reference}")) {
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
            Ok(()) => Ok(self.files.get(&format!("{path}@{reference}")).cloned()),
        }
    }

    async fn list_installation_repositories(
        &self,
        page: u32,
    ) -> Result<ResultPage<Repository>, Error> {
        self.enter("list_installation_repositories", format!("page {page}"))?;
        Ok(page_of(self.repository_pages.clone(), page))
    }
}

fn page_of<T>(mut pages: Vec<Vec<T>>, page: u32) -> ResultPage<T> {
    let index = page.saturating_sub(1) as usize;
    let next_page = if index + 1 < pages.len() {
        Some(page + 1)
    } else {
        None
    };
    let items = if index < pages.len() {
        pages.swap_remove(index)
    } else {
        Vec::new()
    };
    ResultPage { items, next_page }
}

/// In-memory [`ClientProvider`].
#[derive(Default)]
pub struct MockClientProvider {
    installations: Vec<Installation>,
    clients: HashMap<u64, Arc<MockPullRequestClient>>,
    fail_listing: bool,
}

impl MockClientProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an installation served by `client`.
    pub fn with_installation(
        mut self,
        installation: Installation,
        client: Arc<MockPullRequestClient>,
    ) -> Self {
        self.clients.insert(installation.id, client);
        self.installations.push(installation);
        self
    }

    /// Registers an installation for which no client can be created.
    pub fn with_broken_installation(mut self, installation: Installation) -> Self {
        self.installations.push(installation);
        self
    }

    pub fn with_listing_failure(mut self) -> Self {
        self.fail_listing = true;
        self
    }
}

#[async_trait]
impl ClientProvider for MockClientProvider {
    async fn list_installations(&self) -> Result<Vec<Installation>, Error> {
        if self.fail_listing {
            return Err(Error::AuthError("JWT rejected".to_string()));
        }
        Ok(self.installations.clone())
    }

    async fn installation_client(
        &self,
        installation_id: u64,
    ) -> Result<Arc<dyn PullRequestClient>, Error> {
        match self.clients.get(&installation_id) {
            Some(client) => Ok(client.clone() as Arc<dyn PullRequestClient>),
            None => Err(Error::AuthError(format!(
                "Failed to create an access token for installation {installation_id}"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
