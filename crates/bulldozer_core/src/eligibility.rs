//! Update and merge eligibility decisions.
//!
//! Both axes short-circuit in a fixed order so the cheapest checks run first and no
//! GitHub data is fetched once the outcome is known.

use github_client::models::CheckState;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::config::{MergeConfig, Pattern, Signals, UpdateConfig};
use crate::errors::BulldozerError;
use crate::pull_context::PullContext;

/// Why a pull request was found ineligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IneligibleReason {
    /// The pull request is a draft
    Draft,
    /// No rule that could make the pull request eligible is configured
    NotConfigured,
    /// An ignore rule matched; carries the match description
    Ignored(String),
    /// Trigger rules are configured but none matched
    NotTriggered,
    /// Required statuses that are not successful, in configuration order
    UnsatisfiedStatuses(Vec<String>),
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "pull request is a draft"),
            Self::NotConfigured => write!(f, "no trigger is configured"),
            Self::Ignored(reason) => write!(f, "{reason}"),
            Self::NotTriggered => write!(f, "pull request does not match any trigger"),
            Self::UnsatisfiedStatuses(names) => {
                write!(f, "required statuses not satisfied: {}", names.join(", "))
            }
        }
    }
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Eligible,
    Ineligible(IneligibleReason),
}

impl Decision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Decision::Eligible)
    }
}

/// Decides whether a pull request should be brought up to date with its base branch.
pub async fn should_update(
    ctx: &dyn PullContext,
    config: &UpdateConfig,
) -> Result<Decision, BulldozerError> {
    if ctx.is_draft() && !config.draft_update {
        debug!(pull_request = %ctx.locator(), "Draft pull request is not updated");
        return Ok(Decision::Ineligible(IneligibleReason::Draft));
    }

    if !config.ignore.enabled() && !config.trigger.enabled() && config.required_statuses.is_empty()
    {
        return Ok(Decision::Ineligible(IneligibleReason::NotConfigured));
    }

    if let Some(decision) = evaluate_signals(ctx, &config.trigger, &config.ignore).await? {
        return Ok(decision);
    }

    if !config.required_statuses.is_empty() {
        let unsatisfied = unsatisfied_statuses(
            ctx,
            &config.required_statuses,
            &config.required_statuses_description_whitelist,
        )
        .await?;
        if !unsatisfied.is_empty() {
            return Ok(Decision::Ineligible(IneligibleReason::UnsatisfiedStatuses(
                unsatisfied,
            )));
        }
    }

    Ok(Decision::Eligible)
}

/// Decides whether a pull request should be merged.
pub async fn should_merge(
    ctx: &dyn PullContext,
    config: &MergeConfig,
) -> Result<Decision, BulldozerError> {
    if ctx.is_draft() {
        return Ok(Decision::Ineligible(IneligibleReason::Draft));
    }

    if !config.ignore.enabled() && !config.trigger.enabled() {
        return Ok(Decision::Ineligible(IneligibleReason::NotConfigured));
    }

    if let Some(decision) = evaluate_signals(ctx, &config.trigger, &config.ignore).await? {
        return Ok(decision);
    }

    if !config.required_statuses.is_empty() {
        let unsatisfied =
            unsatisfied_statuses(ctx, &config.required_statuses, &HashMap::new()).await?;
        if !unsatisfied.is_empty() {
            return Ok(Decision::Ineligible(IneligibleReason::UnsatisfiedStatuses(
                unsatisfied,
            )));
        }
    }

    Ok(Decision::Eligible)
}

/// Applies the ignore then the trigger rule set; `None` means evaluation continues.
async fn evaluate_signals(
    ctx: &dyn PullContext,
    trigger: &Signals,
    ignore: &Signals,
) -> Result<Option<Decision>, BulldozerError> {
    if ignore.enabled() {
        if let Some(reason) = ignore.matches(ctx).await? {
            debug!(pull_request = %ctx.locator(), %reason, "Ignore rule matched");
            return Ok(Some(Decision::Ineligible(IneligibleReason::Ignored(
                reason,
            ))));
        }
    }

    if trigger.enabled() {
        match trigger.matches(ctx).await? {
            Some(reason) => {
                debug!(pull_request = %ctx.locator(), %reason, "Trigger rule matched");
            }
            None => return Ok(Some(Decision::Ineligible(IneligibleReason::NotTriggered))),
        }
    }

    Ok(None)
}

/// Required status names that are not successful on the head commit.
///
/// A failing status whose description matches one of its whitelist patterns counts as
/// successful. Pending statuses are never promoted.
async fn unsatisfied_statuses(
    ctx: &dyn PullContext,
    required: &[String],
    description_whitelist: &HashMap<String, Vec<Pattern>>,
) -> Result<Vec<String>, BulldozerError> {
    let checks = ctx.status_checks().await?;

    let mut successes: HashSet<&str> = checks
        .iter()
        .filter(|c| c.state == CheckState::Success)
        .map(|c| c.name.as_str())
        .collect();

    for check in checks.iter().filter(|c| c.state == CheckState::Failure) {
        let Some(patterns) = description_whitelist.get(&check.name) else {
            continue;
        };
        let description = check.description.as_deref().unwrap_or_default();
        if let Some(pattern) = patterns.iter().find(|p| p.is_match(description)) {
            debug!(
                pull_request = %ctx.locator(),
                status = %check.name,
                pattern = pattern.as_str(),
                "Failed status accepted by description whitelist"
            );
            successes.insert(check.name.as_str());
        }
    }

    Ok(required
        .iter()
        .filter(|name| !successes.contains(name.as_str()))
        .cloned()
        .collect())
}

#[cfg(test)]
#[path = "eligibility_tests.rs"]
mod tests;
