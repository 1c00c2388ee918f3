//! Read-only view over one pull request.
//!
//! A [`PullContext`] is built from a freshly fetched pull request snapshot and lives for a
//! single evaluation. Scalar attributes come from the snapshot; labels, comments, reviews,
//! commits, status checks and push restrictions are fetched on first use and cached.

use async_trait::async_trait;
use github_client::models::{Commit, PullRequest, PullRequestState, StatusCheck};
use github_client::PullRequestClient;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::errors::BulldozerError;

/// Everything the eligibility rules and merge strategies need to know about a pull request.
#[async_trait]
pub trait PullContext: Send + Sync {
    fn owner(&self) -> &str;
    fn repo(&self) -> &str;
    fn number(&self) -> u64;
    fn title(&self) -> &str;
    fn body(&self) -> &str;

    /// Short name of the branch the pull request targets.
    fn base_ref(&self) -> &str;

    /// Short name of the branch the pull request comes from.
    fn head_ref(&self) -> &str;
    fn head_sha(&self) -> &str;
    fn is_draft(&self) -> bool;
    fn is_fork(&self) -> bool;
    fn state(&self) -> PullRequestState;

    /// `owner/repo#number`, used in logs and errors.
    fn locator(&self) -> String {
        format!("{}/{}#{}", self.owner(), self.repo(), self.number())
    }

    async fn labels(&self) -> Result<Vec<String>, BulldozerError>;

    /// Bodies of issue comments.
    async fn comments(&self) -> Result<Vec<String>, BulldozerError>;

    /// Bodies of submitted reviews.
    async fn reviews(&self) -> Result<Vec<String>, BulldozerError>;

    async fn commits(&self) -> Result<Vec<Commit>, BulldozerError>;

    /// Current status checks on the head commit.
    async fn status_checks(&self) -> Result<Vec<StatusCheck>, BulldozerError>;

    /// Whether pushes to the base branch are restricted to specific identities.
    async fn push_restrictions(&self) -> Result<bool, BulldozerError>;
}

/// [`PullContext`] backed by the GitHub API.
pub struct GitHubPullContext {
    client: Arc<dyn PullRequestClient>,
    owner: String,
    repo: String,
    pr: PullRequest,
    labels: OnceCell<Vec<String>>,
    comments: OnceCell<Vec<String>>,
    reviews: OnceCell<Vec<String>>,
    commits: OnceCell<Vec<Commit>>,
    status_checks: OnceCell<Vec<StatusCheck>>,
    push_restrictions: OnceCell<bool>,
}

impl GitHubPullContext {
    pub fn new(
        client: Arc<dyn PullRequestClient>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        pr: PullRequest,
    ) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            pr,
            labels: OnceCell::new(),
            comments: OnceCell::new(),
            reviews: OnceCell::new(),
            commits: OnceCell::new(),
            status_checks: OnceCell::new(),
            push_restrictions: OnceCell::new(),
        }
    }

    /// The snapshot this context was built from.
    pub fn pull_request(&self) -> &PullRequest {
        &self.pr
    }

    fn data_error(&self, what: &'static str) -> impl FnOnce(github_client::Error) -> BulldozerError {
        let pull_request = self.locator();
        move |source| BulldozerError::EvaluationData {
            what,
            pull_request,
            source,
        }
    }
}

#[async_trait]
impl PullContext for GitHubPullContext {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    fn number(&self) -> u64 {
        self.pr.number
    }

    fn title(&self) -> &str {
        &self.pr.title
    }

    fn body(&self) -> &str {
        self.pr.body.as_deref().unwrap_or_default()
    }

    fn base_ref(&self) -> &str {
        &self.pr.base.reference
    }

    fn head_ref(&self) -> &str {
        &self.pr.head.reference
    }

    fn head_sha(&self) -> &str {
        &self.pr.head.sha
    }

    fn is_draft(&self) -> bool {
        self.pr.draft
    }

    fn is_fork(&self) -> bool {
        self.pr.is_fork()
    }

    fn state(&self) -> PullRequestState {
        self.pr.state
    }

    async fn labels(&self) -> Result<Vec<String>, BulldozerError> {
        self.labels
            .get_or_try_init(|| async {
                let labels = self
                    .client
                    .list_labels(&self.owner, &self.repo, self.pr.number)
                    .await
                    .map_err(self.data_error("labels"))?;
                Ok::<_, BulldozerError>(labels.into_iter().map(|l| l.name).collect())
            })
            .await
            .cloned()
    }

    async fn comments(&self) -> Result<Vec<String>, BulldozerError> {
        self.comments
            .get_or_try_init(|| async {
                let comments = self
                    .client
                    .list_issue_comments(&self.owner, &self.repo, self.pr.number)
                    .await
                    .map_err(self.data_error("comments"))?;
                Ok::<_, BulldozerError>(comments.into_iter().filter_map(|c| c.body).collect())
            })
            .await
            .cloned()
    }

    async fn reviews(&self) -> Result<Vec<String>, BulldozerError> {
        self.reviews
            .get_or_try_init(|| async {
                let reviews = self
                    .client
                    .list_reviews(&self.owner, &self.repo, self.pr.number)
                    .await
                    .map_err(self.data_error("reviews"))?;
                Ok::<_, BulldozerError>(reviews.into_iter().filter_map(|r| r.body).collect())
            })
            .await
            .cloned()
    }

    async fn commits(&self) -> Result<Vec<Commit>, BulldozerError> {
        self.commits
            .get_or_try_init(|| async {
                self.client
                    .list_commits(&self.owner, &self.repo, self.pr.number)
                    .await
                    .map_err(self.data_error("commits"))
            })
            .await
            .cloned()
    }

    async fn status_checks(&self) -> Result<Vec<StatusCheck>, BulldozerError> {
        self.status_checks
            .get_or_try_init(|| async {
                self.client
                    .list_status_checks(&self.owner, &self.repo, &self.pr.head.sha)
                    .await
                    .map_err(self.data_error("status checks"))
            })
            .await
            .cloned()
    }

    async fn push_restrictions(&self) -> Result<bool, BulldozerError> {
        self.push_restrictions
            .get_or_try_init(|| async {
                self.client
                    .has_push_restrictions(&self.owner, &self.repo, &self.pr.base.reference)
                    .await
                    .map_err(self.data_error("push restrictions"))
            })
            .await
            .copied()
    }
}

#[cfg(test)]
#[path = "pull_context_tests.rs"]
mod tests;
