//! Merge strategies and the merge action.
//!
//! A [`Merger`] performs the two write operations of the merge axis: merging the pull
//! request and deleting its head branch. [`GitHubMerger`] acts with the credentials of
//! the client it wraps. [`PushRestrictionMerger`] routes merges into branches with push
//! restrictions through a second merger (typically authenticated with a user token the
//! restrictions allow) and keeps everything else on the primary one.

use async_trait::async_trait;
use github_client::models::{MergeMethod, MergeRequest, MergeResult};
use github_client::PullRequestClient;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::{BodyStrategy, MergeConfig, SquashOptions, TitleStrategy};
use crate::errors::BulldozerError;
use crate::events::list_open_pull_requests_for_base;
use crate::pull_context::PullContext;

/// Carries out merges on behalf of the engine.
#[async_trait]
pub trait Merger: Send + Sync {
    /// Merges the pull request as described by `request`.
    async fn merge(
        &self,
        ctx: &dyn PullContext,
        request: &MergeRequest,
    ) -> Result<MergeResult, BulldozerError>;

    /// Deletes the pull request's head branch.
    async fn delete_head(&self, ctx: &dyn PullContext) -> Result<(), BulldozerError>;
}

/// Merges with the identity of the wrapped client.
#[derive(Clone)]
pub struct GitHubMerger {
    client: Arc<dyn PullRequestClient>,
}

impl GitHubMerger {
    pub fn new(client: Arc<dyn PullRequestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Merger for GitHubMerger {
    async fn merge(
        &self,
        ctx: &dyn PullContext,
        request: &MergeRequest,
    ) -> Result<MergeResult, BulldozerError> {
        self.client
            .merge_pull_request(ctx.owner(), ctx.repo(), ctx.number(), request)
            .await
            .map_err(|source| BulldozerError::Action {
                action: "merge",
                pull_request: ctx.locator(),
                source,
            })
    }

    async fn delete_head(&self, ctx: &dyn PullContext) -> Result<(), BulldozerError> {
        self.client
            .delete_branch(ctx.owner(), ctx.repo(), ctx.head_ref())
            .await
            .map_err(|source| BulldozerError::Action {
                action: "delete the head branch of",
                pull_request: ctx.locator(),
                source,
            })
    }
}

/// Uses `restricted` for merges into branches with push restrictions and `normal` for
/// everything else.
#[derive(Clone)]
pub struct PushRestrictionMerger {
    normal: Arc<dyn Merger>,
    restricted: Arc<dyn Merger>,
}

impl PushRestrictionMerger {
    pub fn new(normal: Arc<dyn Merger>, restricted: Arc<dyn Merger>) -> Self {
        Self { normal, restricted }
    }
}

#[async_trait]
impl Merger for PushRestrictionMerger {
    async fn merge(
        &self,
        ctx: &dyn PullContext,
        request: &MergeRequest,
    ) -> Result<MergeResult, BulldozerError> {
        if ctx.push_restrictions().await? {
            debug!(
                pull_request = %ctx.locator(),
                base = ctx.base_ref(),
                "Base branch has push restrictions, merging with the restricted identity"
            );
            return self.restricted.merge(ctx, request).await;
        }
        self.normal.merge(ctx, request).await
    }

    async fn delete_head(&self, ctx: &dyn PullContext) -> Result<(), BulldozerError> {
        self.normal.delete_head(ctx).await
    }
}

/// What the merge action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// SHA of the merge commit reported by GitHub
    pub sha: Option<String>,
    /// Whether the head branch was deleted afterwards
    pub head_deleted: bool,
}

/// Merges an eligible pull request and optionally deletes its head branch.
///
/// The head branch is kept when it lives in a fork or when another open pull request
/// targets it. A failed deletion is logged and does not fail the merge.
#[instrument(skip_all, fields(pull_request = %ctx.locator()))]
pub async fn merge_pull_request(
    client: &dyn PullRequestClient,
    ctx: &dyn PullContext,
    merger: &dyn Merger,
    config: &MergeConfig,
) -> Result<MergeOutcome, BulldozerError> {
    let request = build_merge_request(ctx, config).await?;
    let result = merger.merge(ctx, &request).await?;

    if !result.merged {
        return Err(BulldozerError::Action {
            action: "merge",
            pull_request: ctx.locator(),
            source: github_client::Error::Conflict(
                result
                    .message
                    .unwrap_or_else(|| "merge was not performed".to_string()),
            ),
        });
    }

    info!(
        method = %request.merge_method,
        sha = result.sha.as_deref().unwrap_or_default(),
        "Merged pull request"
    );

    let mut head_deleted = false;
    if config.delete_after_merge && !ctx.is_fork() {
        let dependents =
            list_open_pull_requests_for_base(client, ctx.owner(), ctx.repo(), ctx.head_ref())
                .await?;
        if dependents.is_empty() {
            match merger.delete_head(ctx).await {
                Ok(()) => {
                    info!(branch = ctx.head_ref(), "Deleted head branch");
                    head_deleted = true;
                }
                Err(e) => warn!(error = %e, "Failed to delete head branch"),
            }
        } else {
            info!(
                branch = ctx.head_ref(),
                dependents = dependents.len(),
                "Keeping head branch, other open pull requests target it"
            );
        }
    }

    Ok(MergeOutcome {
        sha: result.sha,
        head_deleted,
    })
}

/// Builds the merge API request: method, expected head SHA and, for squash merges, the
/// commit title and message.
pub async fn build_merge_request(
    ctx: &dyn PullContext,
    config: &MergeConfig,
) -> Result<MergeRequest, BulldozerError> {
    let mut request = MergeRequest {
        merge_method: config.method,
        commit_title: None,
        commit_message: None,
        sha: Some(ctx.head_sha().to_string()),
    };

    if config.method != MergeMethod::Squash {
        return Ok(request);
    }

    let squash = &config.options.squash;

    request.commit_title = match squash.title {
        TitleStrategy::PullRequestTitle => Some(format!("{} (#{})", ctx.title(), ctx.number())),
        TitleStrategy::FirstCommitTitle => ctx
            .commits()
            .await?
            .first()
            .map(|c| first_line(&c.message).to_string()),
        TitleStrategy::GithubDefaultTitle => None,
    };

    request.commit_message = match squash.body {
        BodyStrategy::EmptyBody => Some(String::new()),
        BodyStrategy::SummarizeCommits => Some(
            ctx.commits()
                .await?
                .iter()
                .map(|c| format!("* {}", first_line(&c.message)))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        BodyStrategy::PullRequestBody => Some(truncate_body(ctx.body(), squash)),
    };

    Ok(request)
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default().trim()
}

/// Cuts a pull request body down to the commit message part.
///
/// At most one rule is set; validation rejects files that set more.
pub fn truncate_body(body: &str, options: &SquashOptions) -> String {
    let message = if let Some(rx) = options
        .message_end_marker_rx
        .as_ref()
        .filter(|rx| !rx.as_str().is_empty())
    {
        match rx.find_start(body) {
            Some(end) => &body[..end],
            None => body,
        }
    } else if let Some(marker) = options.message_end_marker.as_deref().filter(|m| !m.is_empty()) {
        body.split(marker).next().unwrap_or(body)
    } else if let Some(delimiter) = options.message_delimiter.as_deref().filter(|d| !d.is_empty()) {
        let parts: Vec<&str> = body.split(delimiter).collect();
        if parts.len() == 3 {
            parts[1]
        } else {
            body
        }
    } else {
        body
    };

    message.trim().to_string()
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
