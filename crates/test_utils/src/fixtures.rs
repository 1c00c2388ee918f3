//! Builders for GitHub model values used across the test suites.

use github_client::models::{
    BranchRef, CheckState, Owner, PullRequest, PullRequestState, Repository, RepositoryRef,
    Review, ReviewState, StatusCheck,
};
use github_client::{Account, Installation};

pub const OWNER: &str = "octo-org";
pub const REPO: &str = "widgets";

fn repository_ref(owner: &str, repo: &str) -> RepositoryRef {
    RepositoryRef {
        name: repo.to_string(),
        full_name: format!("{owner}/{repo}"),
        fork: false,
        owner: Owner {
            login: owner.to_string(),
        },
    }
}

/// Builder for [`PullRequest`] values. Defaults to an open, non-draft pull request from
/// `feature-<number>` into `main` in `octo-org/widgets`.
#[derive(Debug, Clone)]
pub struct PullRequestBuilder {
    pr: PullRequest,
}

impl PullRequestBuilder {
    pub fn new(number: u64) -> Self {
        Self {
            pr: PullRequest {
                number,
                state: PullRequestState::Open,
                draft: false,
                title: format!("Change {number}"),
                body: None,
                head: BranchRef {
                    reference: format!("feature-{number}"),
                    sha: format!("head-sha-{number}"),
                    repo: Some(repository_ref(OWNER, REPO)),
                },
                base: BranchRef {
                    reference: "main".to_string(),
                    sha: "base-sha".to_string(),
                    repo: Some(repository_ref(OWNER, REPO)),
                },
                labels: Vec::new(),
                mergeable: Some(true),
                html_url: None,
            },
        }
    }

    pub fn repository(mut self, owner: &str, repo: &str) -> Self {
        self.pr.head.repo = Some(repository_ref(owner, repo));
        self.pr.base.repo = Some(repository_ref(owner, repo));
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.pr.title = title.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.pr.body = Some(body.to_string());
        self
    }

    pub fn head_ref(mut self, head: &str) -> Self {
        self.pr.head.reference = head.to_string();
        self
    }

    pub fn head_sha(mut self, sha: &str) -> Self {
        self.pr.head.sha = sha.to_string();
        self
    }

    pub fn base_ref(mut self, base: &str) -> Self {
        self.pr.base.reference = base.to_string();
        self
    }

    pub fn draft(mut self) -> Self {
        self.pr.draft = true;
        self
    }

    pub fn closed(mut self) -> Self {
        self.pr.state = PullRequestState::Closed;
        self
    }

    /// Moves the head branch into a fork owned by `contributor`.
    pub fn fork(mut self) -> Self {
        let mut head_repo = repository_ref("contributor", REPO);
        head_repo.fork = true;
        self.pr.head.repo = Some(head_repo);
        self
    }

    pub fn build(self) -> PullRequest {
        self.pr
    }
}

/// Shorthand for `PullRequestBuilder::new(number)`.
pub fn pull_request(number: u64) -> PullRequestBuilder {
    PullRequestBuilder::new(number)
}

pub fn status(name: &str, state: CheckState, description: Option<&str>) -> StatusCheck {
    StatusCheck {
        name: name.to_string(),
        state,
        description: description.map(str::to_string),
    }
}

pub fn review(id: u64, state: ReviewState, body: &str) -> Review {
    Review {
        id,
        state,
        body: Some(body.to_string()),
    }
}

pub fn repository(owner: &str, name: &str) -> Repository {
    Repository::new(name, owner, false)
}

pub fn installation(id: u64, login: &str) -> Installation {
    Installation {
        id,
        account: Account {
            id: id * 10,
            login: login.to_string(),
            account_type: "Organization".to_string(),
        },
        repository_selection: Some("all".to_string()),
    }
}
