//! Background task that brings a pull request up to date with its base branch.
//!
//! The reconciler polls the pull request on a fixed interval. Once the head is behind
//! the base it merges the base into the head a single time and stops, whatever the
//! result. Closed pull requests and fork heads end the task early, and the task gives
//! up silently after a bounded number of ticks.

use github_client::models::BranchMergeOutcome;
use github_client::PullRequestClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Timing of the update reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSettings {
    /// Delay before the first poll and between polls
    pub interval: Duration,
    /// Maximum number of polls per invocation
    pub max_ticks: u32,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_ticks: 5,
        }
    }
}

/// How a reconciler invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The base branch was merged into the head
    Updated { sha: String },
    /// The head was not behind the base
    AlreadyCurrent,
    /// GitHub reported nothing to merge
    NothingToMerge,
    /// The base cannot be merged into the head without conflicts
    Conflict,
    /// The pull request was closed
    Closed,
    /// The head lives in a fork the bot cannot push to
    Fork,
    /// The update call failed
    Failed(String),
    /// No tick reached a decision
    Exhausted,
}

/// Polls one pull request and updates it once it falls behind its base.
#[derive(Clone)]
pub struct UpdateReconciler {
    client: Arc<dyn PullRequestClient>,
    settings: UpdateSettings,
}

impl UpdateReconciler {
    pub fn new(client: Arc<dyn PullRequestClient>, settings: UpdateSettings) -> Self {
        Self { client, settings }
    }

    /// Runs the reconciler on its own task. Nothing waits on the returned handle in
    /// production; it exists for tests and diagnostics.
    pub fn spawn(
        self,
        owner: String,
        repo: String,
        number: u64,
        base_ref: String,
    ) -> JoinHandle<UpdateOutcome> {
        tokio::spawn(async move { self.run(&owner, &repo, number, &base_ref).await })
    }

    #[instrument(skip(self), fields(pr_number = number))]
    pub async fn run(&self, owner: &str, repo: &str, number: u64, base_ref: &str) -> UpdateOutcome {
        let start = Instant::now() + self.settings.interval;
        let mut ticker = interval_at(start, self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for tick in 1..=self.settings.max_ticks {
            ticker.tick().await;

            if let Some(outcome) = self.poll(owner, repo, number, base_ref, tick).await {
                return outcome;
            }
        }

        info!(
            ticks = self.settings.max_ticks,
            "Gave up waiting for the pull request to fall behind its base"
        );
        UpdateOutcome::Exhausted
    }

    /// One polling step. `None` means "try again on the next tick".
    async fn poll(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        base_ref: &str,
        tick: u32,
    ) -> Option<UpdateOutcome> {
        let pr = match self.client.get_pull_request(owner, repo, number).await {
            Ok(pr) => pr,
            Err(e) => {
                warn!(tick, error = %e, "Failed to fetch pull request");
                return None;
            }
        };

        if pr.is_closed() {
            debug!(tick, "Pull request is closed");
            return Some(UpdateOutcome::Closed);
        }
        if pr.is_fork() {
            debug!(tick, "Pull request head is in a fork");
            return Some(UpdateOutcome::Fork);
        }

        let comparison = match self
            .client
            .compare_commits(owner, repo, base_ref, &pr.head.sha)
            .await
        {
            Ok(comparison) => comparison,
            Err(e) => {
                warn!(tick, error = %e, "Failed to compare head with base");
                return None;
            }
        };

        if comparison.behind_by == 0 {
            debug!(tick, "Pull request is up to date");
            return Some(UpdateOutcome::AlreadyCurrent);
        }

        let outcome = match self
            .client
            .merge_branch(owner, repo, &pr.head.reference, base_ref)
            .await
        {
            Ok(BranchMergeOutcome::Merged { sha }) => {
                info!(behind_by = comparison.behind_by, %sha, "Updated pull request");
                UpdateOutcome::Updated { sha }
            }
            Ok(BranchMergeOutcome::NothingToMerge) => {
                debug!("Nothing to merge");
                UpdateOutcome::NothingToMerge
            }
            Ok(BranchMergeOutcome::Conflict) => {
                info!("Base cannot be merged into head without conflicts");
                UpdateOutcome::Conflict
            }
            Err(e) => {
                warn!(error = %e, "Failed to update pull request");
                UpdateOutcome::Failed(e.to_string())
            }
        };
        Some(outcome)
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
