//! The per pull request pipeline: resolve the policy, evaluate both axes and act.

use github_client::models::PullRequestState;
use github_client::PullRequestClient;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config_resolver::{ConfigResolver, ConfigState};
use crate::eligibility::{should_merge, should_update, Decision, IneligibleReason};
use crate::errors::BulldozerError;
use crate::merge::{merge_pull_request, GitHubMerger, MergeOutcome, Merger, PushRestrictionMerger};
use crate::pull_context::PullContext;
use crate::update::{UpdateOutcome, UpdateReconciler, UpdateSettings};

/// What happened on the update axis.
#[derive(Debug)]
pub enum UpdateAction {
    Skipped(IneligibleReason),
    /// A reconciler was started; nothing in the pipeline waits on it
    Scheduled(JoinHandle<UpdateOutcome>),
    /// Evaluation failed; the merge axis still ran
    Failed(String),
}

/// What happened on the merge axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    Skipped(IneligibleReason),
    Merged(MergeOutcome),
}

/// Summary of one pass through the pipeline.
#[derive(Debug)]
pub enum ProcessOutcome {
    Closed,
    NoConfiguration,
    InvalidConfiguration,
    Evaluated {
        update: UpdateAction,
        merge: MergeAction,
    },
}

/// Drives a pull request through configuration, eligibility, update and merge.
#[derive(Clone)]
pub struct PullRequestProcessor {
    resolver: Arc<ConfigResolver>,
    push_restriction_client: Option<Arc<dyn PullRequestClient>>,
    update_settings: UpdateSettings,
}

impl PullRequestProcessor {
    pub fn new(resolver: Arc<ConfigResolver>) -> Self {
        Self {
            resolver,
            push_restriction_client: None,
            update_settings: UpdateSettings::default(),
        }
    }

    /// Merges into branches with push restrictions using `client` instead of the
    /// installation's own identity.
    pub fn with_push_restriction_client(mut self, client: Arc<dyn PullRequestClient>) -> Self {
        self.push_restriction_client = Some(client);
        self
    }

    pub fn with_update_settings(mut self, settings: UpdateSettings) -> Self {
        self.update_settings = settings;
        self
    }

    fn merger_for(&self, client: &Arc<dyn PullRequestClient>) -> Arc<dyn Merger> {
        let direct: Arc<dyn Merger> = Arc::new(GitHubMerger::new(client.clone()));
        match &self.push_restriction_client {
            Some(token_client) => Arc::new(PushRestrictionMerger::new(
                direct,
                Arc::new(GitHubMerger::new(token_client.clone())),
            )),
            None => direct,
        }
    }

    /// Runs the pipeline once. `base_ref` is the branch the head is brought up to date
    /// with.
    ///
    /// Errors on the update axis are logged and recorded in the outcome; errors resolving
    /// the policy or on the merge axis are returned.
    #[instrument(skip_all, fields(pull_request = %ctx.locator()))]
    pub async fn process(
        &self,
        client: Arc<dyn PullRequestClient>,
        ctx: &dyn PullContext,
        base_ref: &str,
    ) -> Result<ProcessOutcome, BulldozerError> {
        if ctx.state() == PullRequestState::Closed {
            debug!("Pull request is closed");
            return Ok(ProcessOutcome::Closed);
        }

        let fetched = self
            .resolver
            .resolve(client.as_ref(), ctx.owner(), ctx.repo(), ctx.base_ref())
            .await?;

        let config = match &fetched.state {
            ConfigState::Valid(config) => config.clone(),
            ConfigState::Missing => {
                debug!(reference = %fetched.reference, "No policy applies");
                return Ok(ProcessOutcome::NoConfiguration);
            }
            ConfigState::Invalid(e) => {
                warn!(reference = %fetched.reference, error = %e, "Ignoring invalid policy");
                return Ok(ProcessOutcome::InvalidConfiguration);
            }
        };

        let update = match should_update(ctx, &config.update).await {
            Ok(Decision::Eligible) => {
                info!("Pull request is eligible for update");
                let reconciler = UpdateReconciler::new(client.clone(), self.update_settings);
                UpdateAction::Scheduled(reconciler.spawn(
                    ctx.owner().to_string(),
                    ctx.repo().to_string(),
                    ctx.number(),
                    base_ref.to_string(),
                ))
            }
            Ok(Decision::Ineligible(reason)) => {
                debug!(%reason, "Pull request is not eligible for update");
                UpdateAction::Skipped(reason)
            }
            Err(e) => {
                warn!(error = %e, "Failed to evaluate update eligibility");
                UpdateAction::Failed(e.to_string())
            }
        };

        let merge = match should_merge(ctx, &config.merge).await? {
            Decision::Eligible => {
                info!("Pull request is eligible for merge");
                let merger = self.merger_for(&client);
                let outcome =
                    merge_pull_request(client.as_ref(), ctx, merger.as_ref(), &config.merge)
                        .await?;
                MergeAction::Merged(outcome)
            }
            Decision::Ineligible(reason) => {
                debug!(%reason, "Pull request is not eligible for merge");
                MergeAction::Skipped(reason)
            }
        };

        Ok(ProcessOutcome::Evaluated { update, merge })
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
