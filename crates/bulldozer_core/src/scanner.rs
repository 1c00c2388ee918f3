//! Sweep over every open pull request the app can see.
//!
//! Notifications can be lost, so the service runs this once at startup. Units are
//! processed one after another; a failure skips only the installation, repository or
//! pull request it happened in.

use github_client::models::Repository;
use github_client::{ClientProvider, Installation, PullRequestClient};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::BulldozerError;
use crate::events::list_all_open_pull_requests;
use crate::processor::PullRequestProcessor;
use crate::pull_context::GitHubPullContext;

/// Totals of a full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub installations: usize,
    pub repositories: usize,
    pub pull_requests: usize,
    pub failures: usize,
}

pub struct FullScanReconciler {
    provider: Arc<dyn ClientProvider>,
    processor: Arc<PullRequestProcessor>,
}

impl FullScanReconciler {
    pub fn new(provider: Arc<dyn ClientProvider>, processor: Arc<PullRequestProcessor>) -> Self {
        Self {
            provider,
            processor,
        }
    }

    /// Processes every open pull request of every repository of every installation.
    ///
    /// Only a failure to list the installations themselves is returned as an error.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ScanReport, BulldozerError> {
        let installations = self.provider.list_installations().await?;
        let mut report = ScanReport::default();

        for installation in &installations {
            report.installations += 1;
            self.scan_installation(installation, &mut report).await;
        }

        info!(
            installations = report.installations,
            repositories = report.repositories,
            pull_requests = report.pull_requests,
            failures = report.failures,
            "Full scan finished"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(installation_id = installation.id, account = %installation.account.login))]
    async fn scan_installation(&self, installation: &Installation, report: &mut ScanReport) {
        let client = match self.provider.installation_client(installation.id).await {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to authenticate as installation");
                report.failures += 1;
                return;
            }
        };

        let repositories = match list_repositories(client.as_ref()).await {
            Ok(repositories) => repositories,
            Err(e) => {
                warn!(error = %e, "Failed to list installation repositories");
                report.failures += 1;
                return;
            }
        };

        for repository in repositories.iter().filter(|r| !r.is_archived()) {
            report.repositories += 1;
            self.scan_repository(&client, repository, report).await;
        }
    }

    #[instrument(skip_all, fields(owner = repository.owner(), repo = repository.name()))]
    async fn scan_repository(
        &self,
        client: &Arc<dyn PullRequestClient>,
        repository: &Repository,
        report: &mut ScanReport,
    ) {
        let owner = repository.owner();
        let repo = repository.name();

        let pull_requests = match list_all_open_pull_requests(client.as_ref(), owner, repo).await {
            Ok(prs) => prs,
            Err(e) => {
                warn!(error = %e, "Failed to list open pull requests");
                report.failures += 1;
                return;
            }
        };

        for pr in pull_requests {
            report.pull_requests += 1;
            let number = pr.number;
            let base_ref = pr.base.reference.clone();
            let ctx = GitHubPullContext::new(client.clone(), owner, repo, pr);
            if let Err(e) = self.processor.process(client.clone(), &ctx, &base_ref).await {
                warn!(pr_number = number, error = %e, "Failed to process pull request");
                report.failures += 1;
            }
        }
    }
}

async fn list_repositories(
    client: &dyn PullRequestClient,
) -> Result<Vec<Repository>, github_client::Error> {
    let mut repositories = Vec::new();
    let mut page = Some(1);
    while let Some(current) = page {
        let result = client.list_installation_repositories(current).await?;
        repositories.extend(result.items);
        page = result.next_page;
    }
    Ok(repositories)
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
