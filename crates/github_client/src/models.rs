//! # Models
//!
//! This module contains the data models used by the bulldozer policy engine.
//!
//! The models mirror the subset of the GitHub REST payloads that the engine
//! reads: pull requests, labels, comments, reviews, status checks, commit
//! comparisons and repositories. They deserialize directly from the API
//! responses so no intermediate octocrab model is involved.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The login of a GitHub account that owns a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Owner {
    /// The login name of the account
    pub login: String,
}

/// The repository a pull request branch lives in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryRef {
    /// The name of the repository
    pub name: String,
    /// The full name of the repository (owner/name)
    pub full_name: String,
    /// Whether the repository is a fork of another repository
    #[serde(default)]
    pub fork: bool,
    /// The account owning the repository
    pub owner: Owner,
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BranchRef {
    /// The short branch name, e.g. `main`
    #[serde(rename = "ref")]
    pub reference: String,
    /// The commit SHA the branch pointed at when the pull request was read
    pub sha: String,
    /// The repository holding the branch; `None` when a fork was deleted
    pub repo: Option<RepositoryRef>,
}

/// Open/closed state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    /// The pull request is open
    Open,
    /// The pull request was closed or merged
    Closed,
}

impl fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Represents a label on a pull request.
///
/// # Examples
///
/// ```
/// use github_client::models::Label;
///
/// let label = Label {
///     name: "merge when ready".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// The name of the label
    pub name: String,
}

/// A pull request as returned by the pulls API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequest {
    /// Pull request number within the repository
    pub number: u64,
    /// Current state
    pub state: PullRequestState,
    /// Whether the pull request is a draft
    #[serde(default)]
    pub draft: bool,
    /// Title of the pull request
    #[serde(default)]
    pub title: String,
    /// Description of the pull request
    pub body: Option<String>,
    /// Source branch
    pub head: BranchRef,
    /// Target branch
    pub base: BranchRef,
    /// Labels attached when the pull request was read
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Whether GitHub considers the pull request mergeable (`None` while computing)
    pub mergeable: Option<bool>,
    /// Web URL of the pull request
    pub html_url: Option<String>,
}

impl PullRequest {
    /// Returns `true` when the head branch lives outside the base repository.
    ///
    /// A missing head repository (deleted fork) is treated as a fork.
    pub fn is_fork(&self) -> bool {
        match (&self.head.repo, &self.base.repo) {
            (Some(head), Some(base)) => head.full_name != base.full_name,
            (Some(head), None) => head.fork,
            (None, _) => true,
        }
    }

    /// Returns `true` when the pull request is closed.
    pub fn is_closed(&self) -> bool {
        self.state == PullRequestState::Closed
    }
}

/// A page of results from a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// The page to request next, `None` on the last page
    pub next_page: Option<u32>,
}

impl<T> ResultPage<T> {
    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
        }
    }
}

/// An issue comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comment {
    /// Comment ID
    pub id: u64,
    /// Comment body text
    #[serde(default)]
    pub body: Option<String>,
}

/// State of a pull request review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// A review submitted on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Review {
    /// Review ID
    pub id: u64,
    /// Review state
    pub state: ReviewState,
    /// Review body text
    #[serde(default)]
    pub body: Option<String>,
}

/// Outcome of a single status check on a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Success,
    Pending,
    Failure,
}

/// A named status signal on a commit, merged from the commit status API
/// and the check runs API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusCheck {
    /// The status context or check run name
    pub name: String,
    /// Current state
    pub state: CheckState,
    /// Description reported by the producer, if any
    pub description: Option<String>,
}

/// A commit that is part of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Commit {
    /// Commit SHA
    pub sha: String,
    /// Full commit message
    pub message: String,
}

/// Result of comparing two commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comparison {
    /// Number of commits in head that are not in base
    pub ahead_by: u64,
    /// Number of commits in base that are not in head
    pub behind_by: u64,
}

/// Merge method accepted by the pull request merge API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    #[default]
    Merge,
    Squash,
    Rebase,
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Squash => write!(f, "squash"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}

/// Request body for merging a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeRequest {
    /// Merge method to use
    pub merge_method: MergeMethod,
    /// Commit title; `None` lets GitHub pick its default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_title: Option<String>,
    /// Commit message; `None` lets GitHub pick its default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    /// Head SHA the merge is expected to apply to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Response of the pull request merge API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeResult {
    /// Whether the merge was performed
    pub merged: bool,
    /// SHA of the merge commit
    pub sha: Option<String>,
    /// Message returned by GitHub
    pub message: Option<String>,
}

/// Observed result of merging one branch into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchMergeOutcome {
    /// A merge commit was created
    Merged {
        /// SHA of the new merge commit
        sha: String,
    },
    /// The target already contains the source
    NothingToMerge,
    /// The branches conflict and cannot be merged automatically
    Conflict,
}

/// Represents a GitHub repository visible to an installation.
///
/// # Examples
///
/// ```rust
/// use github_client::models::Repository;
///
/// let repo = Repository::new("my-repo", "octo-org", false);
///
/// assert_eq!(repo.full_name(), "octo-org/my-repo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    /// The name of the repository
    name: String,
    /// The full name of the repository (owner/name)
    full_name: String,
    /// The account owning the repository
    owner: Owner,
    /// Whether the repository is archived
    #[serde(default)]
    archived: bool,
}

impl Repository {
    /// Creates a new Repository instance.
    pub fn new(name: impl Into<String>, owner: impl Into<String>, archived: bool) -> Self {
        let name = name.into();
        let owner = owner.into();
        Self {
            full_name: format!("{owner}/{name}"),
            name,
            owner: Owner { login: owner },
            archived,
        }
    }

    /// Returns the name of the repository.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the login of the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner.login
    }

    /// Returns `owner/name`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns whether the repository is archived (read-only).
    pub fn is_archived(&self) -> bool {
        self.archived
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
