//! Matching a pull request against a [`Signals`] rule set.

use tracing::debug;

use crate::config::Signals;
use crate::errors::BulldozerError;
use crate::pull_context::PullContext;

impl Signals {
    /// Returns a description of the first rule the pull request satisfies, or `None`.
    ///
    /// Comments and reviews are only fetched when a comment rule is configured.
    pub async fn matches(&self, ctx: &dyn PullContext) -> Result<Option<String>, BulldozerError> {
        if !self.labels.is_empty() {
            let labels = ctx.labels().await?;
            for wanted in &self.labels {
                if labels.iter().any(|l| l.eq_ignore_ascii_case(wanted)) {
                    return Ok(Some(format!("pull request has label \"{wanted}\"")));
                }
            }
        }

        if self.uses_comments() {
            let mut bodies = ctx.comments().await?;
            bodies.extend(ctx.reviews().await?);

            for body in &bodies {
                let trimmed = body.trim();
                if let Some(comment) = self.comments.iter().find(|c| c.trim() == trimmed) {
                    return Ok(Some(format!("pull request has comment \"{comment}\"")));
                }
                if let Some(substring) = self
                    .comment_substrings
                    .iter()
                    .find(|s| body.contains(s.as_str()))
                {
                    return Ok(Some(format!(
                        "pull request has comment containing \"{substring}\""
                    )));
                }
            }
        }

        if let Some(substring) = self
            .pr_body_substrings
            .iter()
            .find(|s| ctx.body().contains(s.as_str()))
        {
            return Ok(Some(format!(
                "pull request body contains \"{substring}\""
            )));
        }

        let base = ctx.base_ref();
        if self.branches.iter().any(|b| b == base) {
            return Ok(Some(format!("pull request targets branch \"{base}\"")));
        }

        if let Some(pattern) = self.branch_patterns.iter().find(|p| p.is_match(base)) {
            return Ok(Some(format!(
                "pull request target branch \"{base}\" matches pattern \"{}\"",
                pattern.as_str()
            )));
        }

        debug!(pull_request = %ctx.locator(), "No signal matched");
        Ok(None)
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
